//! `ferry.io`: files, line readers and writers
//!
//! Enough of a file API for scripts to persist small amounts of state.
//! Readers and writers hold their OS handle until `close()`; using them
//! afterwards is an `IllegalState` error.

use ferry_host::{ClassBuilder, HostClass, HostError, HostResult, HostType, HostValue};
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

pub const FILE: &str = "ferry.io.File";
pub const FILE_READER: &str = "ferry.io.FileReader";
pub const FILE_WRITER: &str = "ferry.io.FileWriter";

/// Payload of `ferry.io.File`: a path, not an open file.
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
}

impl File {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug)]
pub struct FileReader {
    path: PathBuf,
    inner: Mutex<Option<BufReader<fs::File>>>,
}

impl FileReader {
    pub fn open(path: PathBuf) -> HostResult<Self> {
        let file = fs::File::open(&path)?;
        tracing::debug!(path = %path.display(), "opened file for reading");
        Ok(Self {
            path,
            inner: Mutex::new(Some(BufReader::new(file))),
        })
    }

    /// Next line without its terminator, or `None` at end of file.
    pub fn read_line(&self) -> HostResult<Option<String>> {
        let mut inner = self.inner.lock();
        let reader = inner.as_mut().ok_or_else(|| closed(&self.path))?;
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    pub fn close(&self) {
        self.inner.lock().take();
    }
}

#[derive(Debug)]
pub struct FileWriter {
    path: PathBuf,
    inner: Mutex<Option<fs::File>>,
}

impl FileWriter {
    pub fn create(path: PathBuf, append: bool) -> HostResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(&path)?;
        tracing::debug!(path = %path.display(), append, "opened file for writing");
        Ok(Self {
            path,
            inner: Mutex::new(Some(file)),
        })
    }

    pub fn write(&self, text: &str) -> HostResult<()> {
        let mut inner = self.inner.lock();
        let file = inner.as_mut().ok_or_else(|| closed(&self.path))?;
        file.write_all(text.as_bytes())?;
        Ok(())
    }

    pub fn flush(&self) -> HostResult<()> {
        let mut inner = self.inner.lock();
        let file = inner.as_mut().ok_or_else(|| closed(&self.path))?;
        file.flush()?;
        Ok(())
    }

    pub fn close(&self) -> HostResult<()> {
        if let Some(mut file) = self.inner.lock().take() {
            file.flush()?;
        }
        Ok(())
    }
}

fn closed(path: &Path) -> HostError {
    HostError::IllegalState(format!("{} is closed", path.display()))
}

/// Accepts a `ferry.io.File` or a plain path string.
fn path_arg(value: &HostValue) -> HostResult<PathBuf> {
    if let Some(path) = value.as_str() {
        return Ok(PathBuf::from(path));
    }
    value
        .as_object()
        .and_then(|object| object.downcast_ref::<File>())
        .map(|file| file.path.clone())
        .ok_or_else(|| HostError::IllegalArgument(format!("expected a file or path, got {}", value.host_type())))
}

pub fn file_class() -> HostClass {
    ClassBuilder::new(FILE)
        .constructor_with(vec![HostType::String], |args| Ok(File::new(path_arg(&args[0])?)))
        .constructor_with(vec![HostType::object(FILE), HostType::String], |args| {
            let parent = path_arg(&args[0])?;
            Ok(File::new(parent.join(args[1].as_str().unwrap_or_default())))
        })
        .method_on::<File, _>("exists", vec![], HostType::Boolean, |file, _| {
            Ok(HostValue::Boolean(file.path.exists()))
        })
        .method_on::<File, _>("isFile", vec![], HostType::Boolean, |file, _| {
            Ok(HostValue::Boolean(file.path.is_file()))
        })
        .method_on::<File, _>("getPath", vec![], HostType::String, |file, _| {
            Ok(HostValue::string(file.path.display().to_string()))
        })
        .method_on::<File, _>("getName", vec![], HostType::String, |file, _| {
            let name = file.path.file_name().map(|name| name.to_string_lossy().into_owned());
            Ok(HostValue::string(name.unwrap_or_default()))
        })
        .method_on::<File, _>("getAbsolutePath", vec![], HostType::String, |file, _| {
            let absolute = std::path::absolute(&file.path)?;
            Ok(HostValue::string(absolute.display().to_string()))
        })
        .method_on::<File, _>("length", vec![], HostType::Long, |file, _| {
            let len = fs::metadata(&file.path).map(|meta| meta.len()).unwrap_or(0);
            Ok(HostValue::Long(i64::try_from(len).unwrap_or(i64::MAX)))
        })
        .method_on::<File, _>("delete", vec![], HostType::Boolean, |file, _| {
            Ok(HostValue::Boolean(fs::remove_file(&file.path).is_ok()))
        })
        .method_on::<File, _>("toString", vec![], HostType::String, |file, _| {
            Ok(HostValue::string(file.path.display().to_string()))
        })
        .build()
}

pub fn file_reader_class() -> HostClass {
    ClassBuilder::new(FILE_READER)
        .constructor_with(vec![HostType::object(FILE)], |args| FileReader::open(path_arg(&args[0])?))
        .constructor_with(vec![HostType::String], |args| FileReader::open(path_arg(&args[0])?))
        .method_on::<FileReader, _>("readLine", vec![], HostType::String, |reader, _| {
            Ok(reader.read_line()?.map_or(HostValue::Null, HostValue::String))
        })
        .method_on::<FileReader, _>("close", vec![], HostType::Void, |reader, _| {
            reader.close();
            Ok(HostValue::Null)
        })
        .build()
}

pub fn file_writer_class() -> HostClass {
    ClassBuilder::new(FILE_WRITER)
        .constructor_with(vec![HostType::object(FILE)], |args| {
            FileWriter::create(path_arg(&args[0])?, false)
        })
        .constructor_with(vec![HostType::String], |args| FileWriter::create(path_arg(&args[0])?, false))
        .constructor_with(vec![HostType::object(FILE), HostType::Boolean], |args| {
            FileWriter::create(path_arg(&args[0])?, args[1].as_bool().unwrap_or(false))
        })
        .method_on::<FileWriter, _>("write", vec![HostType::String], HostType::Void, |writer, args| {
            writer.write(args[0].as_str().unwrap_or_default())?;
            Ok(HostValue::Null)
        })
        .method_on::<FileWriter, _>("flush", vec![], HostType::Void, |writer, _| {
            writer.flush()?;
            Ok(HostValue::Null)
        })
        .method_on::<FileWriter, _>("close", vec![], HostType::Void, |writer, _| {
            writer.close()?;
            Ok(HostValue::Null)
        })
        .build()
}

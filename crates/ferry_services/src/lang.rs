//! `ferry.lang`: the root class and a few static helpers

use ferry_host::{ClassBuilder, HostClass, HostError, HostType, HostValue, ROOT_CLASS};
use std::time::{SystemTime, UNIX_EPOCH};

pub const SYSTEM: &str = "ferry.lang.System";
pub const INTEGER: &str = "ferry.lang.Integer";

/// Every class inherits these unless it declares its own.
pub fn object_class() -> HostClass {
    ClassBuilder::new(ROOT_CLASS)
        .method("toString", vec![], HostType::String, |this, _| {
            Ok(HostValue::string(this.to_string()))
        })
        .method("hashCode", vec![], HostType::Int, |this, _| {
            Ok(HostValue::Int(this.identity() as i32))
        })
        .method("equals", vec![HostType::Any], HostType::Boolean, |this, args| {
            let same = args[0].as_object().is_some_and(|other| other.identity() == this.identity());
            Ok(HostValue::Boolean(same))
        })
        .method("getClassName", vec![], HostType::String, |this, _| {
            Ok(HostValue::string(this.class_name()))
        })
        .build()
}

pub fn system_class() -> HostClass {
    ClassBuilder::new(SYSTEM)
        .static_method("currentTimeMillis", vec![], HostType::Long, |_| {
            let millis = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_millis())
                .unwrap_or_default();
            Ok(HostValue::Long(i64::try_from(millis).unwrap_or(i64::MAX)))
        })
        .static_method("getenv", vec![HostType::String], HostType::String, |args| {
            let name = args[0].as_str().unwrap_or_default();
            Ok(std::env::var(name).map(HostValue::String).unwrap_or(HostValue::Null))
        })
        .build()
}

pub fn integer_class() -> HostClass {
    ClassBuilder::new(INTEGER)
        .static_constant("MAX_VALUE", HostType::Int, HostValue::Int(i32::MAX))
        .static_constant("MIN_VALUE", HostType::Int, HostValue::Int(i32::MIN))
        .static_method("parseInt", vec![HostType::String], HostType::Int, |args| {
            let text = args[0].as_str().unwrap_or_default();
            text.trim()
                .parse::<i32>()
                .map(HostValue::Int)
                .map_err(|_| HostError::IllegalArgument(format!("not an int: {text:?}")))
        })
        .static_method(
            "parseInt",
            vec![HostType::String, HostType::Int],
            HostType::Int,
            |args| {
                let text = args[0].as_str().unwrap_or_default();
                let radix = args[1].as_i64().unwrap_or(10);
                let radix = u32::try_from(radix)
                    .ok()
                    .filter(|radix| (2..=36).contains(radix))
                    .ok_or_else(|| HostError::IllegalArgument(format!("radix {radix} out of range")))?;
                i32::from_str_radix(text.trim(), radix)
                    .map(HostValue::Int)
                    .map_err(|_| HostError::IllegalArgument(format!("not an int in radix {radix}: {text:?}")))
            },
        )
        .build()
}

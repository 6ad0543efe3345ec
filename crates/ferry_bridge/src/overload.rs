//! Overload resolution
//!
//! Resolution runs in two phases. Fixed-arity candidates whose parameter count
//! equals the argument count are ranked first; only when none of them accepts
//! the arguments are variable-arity candidates considered. Within a phase the
//! candidate with the lowest total conversion cost wins, and a tie for the
//! lowest cost is an error. Nothing is ever picked by declaration order.

use crate::error::{BridgeError, Result};
use crate::marshal::{conversion_cost, to_host};
use crate::proxy::HandleTable;
use crate::value::ScriptValue;
use ferry_host::{HostType, HostValue, MethodDescriptor};

/// How trailing arguments reach a variable-arity parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Packing {
    /// Arguments map one-to-one onto parameters.
    Fixed,
    /// A single trailing argument already is the array.
    Direct,
    /// Trailing arguments are packed into a fresh array.
    Spread,
}

/// The chosen overload with its converted arguments.
#[derive(Debug)]
pub struct Selection<'m> {
    pub method: &'m MethodDescriptor,
    pub args: Vec<HostValue>,
}

/// Picks the best overload of `target` for `args`.
pub fn select<'m>(
    target: &str,
    candidates: &[&'m MethodDescriptor],
    args: &[ScriptValue],
    handles: &HandleTable,
) -> Result<Selection<'m>> {
    let fixed: Vec<_> = candidates
        .iter()
        .filter(|m| !m.is_varargs() && m.params().len() == args.len())
        .filter_map(|m| fixed_cost(m, args, handles).map(|cost| (*m, cost, Packing::Fixed)))
        .collect();
    if let Some((method, packing)) = pick(target, fixed)? {
        return build(method, packing, args, handles);
    }

    let variable: Vec<_> = candidates
        .iter()
        .filter(|m| m.is_varargs() && args.len() >= m.fixed_arity())
        .filter_map(|m| varargs_cost(m, args, handles).map(|(cost, packing)| (*m, cost, packing)))
        .collect();
    if let Some((method, packing)) = pick(target, variable)? {
        return build(method, packing, args, handles);
    }

    Err(BridgeError::NoApplicableOverload {
        target: target.to_string(),
        arguments: describe_args(args),
    })
}

/// Picks the overload whose parameter list is exactly `signature`.
pub fn select_exact<'m>(
    target: &str,
    candidates: &[&'m MethodDescriptor],
    signature: &[HostType],
    args: &[ScriptValue],
    handles: &HandleTable,
) -> Result<Selection<'m>> {
    let method = candidates
        .iter()
        .copied()
        .find(|m| m.params() == signature)
        .ok_or_else(|| BridgeError::NoApplicableOverload {
            target: target.to_string(),
            arguments: signature
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        })?;

    let packing = if method.is_varargs() {
        if args.len() < method.fixed_arity() {
            None
        } else {
            varargs_cost(method, args, handles).map(|(_, packing)| packing)
        }
    } else if method.params().len() == args.len() {
        Some(Packing::Fixed)
    } else {
        None
    };

    match packing {
        Some(packing) => build(method, packing, args, handles),
        None => Err(BridgeError::NoApplicableOverload {
            target: format!("{target} as {}", method.signature()),
            arguments: describe_args(args),
        }),
    }
}

fn fixed_cost(method: &MethodDescriptor, args: &[ScriptValue], handles: &HandleTable) -> Option<u32> {
    method
        .params()
        .iter()
        .zip(args)
        .map(|(param, arg)| conversion_cost(arg, param, handles))
        .sum()
}

fn varargs_cost(
    method: &MethodDescriptor,
    args: &[ScriptValue],
    handles: &HandleTable,
) -> Option<(u32, Packing)> {
    let fixed = method.fixed_arity();
    let params = method.params();
    let leading: u32 = params[..fixed]
        .iter()
        .zip(&args[..fixed])
        .map(|(param, arg)| conversion_cost(arg, param, handles))
        .sum::<Option<u32>>()?;

    let trailing = &args[fixed..];
    if trailing.len() == 1 {
        if let Some(cost) = conversion_cost(&trailing[0], &params[fixed], handles) {
            return Some((leading + cost, Packing::Direct));
        }
    }

    let element = method.varargs_element()?;
    let spread: u32 = trailing
        .iter()
        .map(|arg| conversion_cost(arg, element, handles))
        .sum::<Option<u32>>()?;
    Some((leading + spread, Packing::Spread))
}

/// Lowest cost wins, ties are errors. `Ok(None)` when nothing applies.
fn pick<'m>(
    target: &str,
    ranked: Vec<(&'m MethodDescriptor, u32, Packing)>,
) -> Result<Option<(&'m MethodDescriptor, Packing)>> {
    let Some(best) = ranked.iter().map(|(_, cost, _)| *cost).min() else {
        return Ok(None);
    };
    let winners: Vec<_> = ranked.iter().filter(|(_, cost, _)| *cost == best).collect();

    if winners.len() > 1 {
        let mut candidates: Vec<String> = winners.iter().map(|(m, _, _)| m.signature()).collect();
        candidates.sort();
        tracing::debug!(method = %target, ?candidates, cost = best, "ambiguous overload");
        return Err(BridgeError::AmbiguousOverload {
            target: target.to_string(),
            candidates,
        });
    }

    let (method, cost, packing) = winners[0];
    tracing::trace!(method = %target, signature = %method.signature(), cost = *cost, "overload selected");
    Ok(Some((*method, *packing)))
}

fn build<'m>(
    method: &'m MethodDescriptor,
    packing: Packing,
    args: &[ScriptValue],
    handles: &HandleTable,
) -> Result<Selection<'m>> {
    let params = method.params();
    let converted = match packing {
        Packing::Fixed | Packing::Direct => params
            .iter()
            .zip(args)
            .map(|(param, arg)| to_host(arg, param, handles))
            .collect::<Result<Vec<_>>>()?,
        Packing::Spread => {
            let fixed = method.fixed_arity();
            let element = method
                .varargs_element()
                .cloned()
                .unwrap_or(HostType::Any);
            let mut converted = params[..fixed]
                .iter()
                .zip(&args[..fixed])
                .map(|(param, arg)| to_host(arg, param, handles))
                .collect::<Result<Vec<_>>>()?;
            let packed = args[fixed..]
                .iter()
                .map(|arg| to_host(arg, &element, handles))
                .collect::<Result<Vec<_>>>()?;
            converted.push(HostValue::array(element, packed));
            converted
        }
    };

    Ok(Selection {
        method,
        args: converted,
    })
}

fn describe_args(args: &[ScriptValue]) -> String {
    args.iter()
        .map(ScriptValue::type_name)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_host::invoker;

    fn method(name: &str, params: Vec<HostType>) -> MethodDescriptor {
        let tag = format!("{name}{params:?}");
        MethodDescriptor::new(
            name,
            params,
            HostType::String,
            invoker(move |_, _| Ok(HostValue::String(tag.clone()))),
        )
    }

    fn varargs(name: &str, params: Vec<HostType>) -> MethodDescriptor {
        method(name, params).with_varargs()
    }

    fn ints(values: &[i64]) -> Vec<ScriptValue> {
        values.iter().map(|v| ScriptValue::Integer(*v)).collect()
    }

    #[test]
    fn fixed_arity_beats_varargs() {
        let table = HandleTable::default();
        let single = method("pick", vec![HostType::Int]);
        let spread = varargs("pick", vec![HostType::Int, HostType::array_of(HostType::Int)]);

        for order in [vec![&single, &spread], vec![&spread, &single]] {
            let selection = select("T.pick", &order, &ints(&[7]), &table).unwrap();
            assert!(!selection.method.is_varargs());
            assert_eq!(selection.args, vec![HostValue::Int(7)]);
        }
    }

    #[test]
    fn varargs_packs_trailing_arguments() {
        let table = HandleTable::default();
        let single = method("pick", vec![HostType::Int]);
        let spread = varargs("pick", vec![HostType::Int, HostType::array_of(HostType::Int)]);

        let selection = select("T.pick", &[&single, &spread], &ints(&[1, 2, 3]), &table).unwrap();
        assert!(selection.method.is_varargs());
        assert_eq!(
            selection.args,
            vec![
                HostValue::Int(1),
                HostValue::array(HostType::Int, vec![HostValue::Int(2), HostValue::Int(3)]),
            ]
        );
    }

    #[test]
    fn varargs_accepts_zero_trailing_arguments() {
        let table = HandleTable::default();
        let spread = varargs("join", vec![HostType::array_of(HostType::String)]);
        let selection = select("T.join", &[&spread], &[], &table).unwrap();
        assert_eq!(selection.args, vec![HostValue::array(HostType::String, vec![])]);
    }

    #[test]
    fn varargs_takes_an_array_directly() {
        let table = HandleTable::default();
        let spread = varargs("join", vec![HostType::array_of(HostType::String)]);
        let args = vec![ScriptValue::from(vec!["a", "b"])];
        let selection = select("T.join", &[&spread], &args, &table).unwrap();
        assert_eq!(
            selection.args,
            vec![HostValue::array(HostType::String, vec!["a".into(), "b".into()])]
        );
    }

    #[test]
    fn fewest_conversions_win() {
        let table = HandleTable::default();
        let long = method("scale", vec![HostType::Long]);
        let double = method("scale", vec![HostType::Double]);
        let selection = select("T.scale", &[&double, &long], &ints(&[2]), &table).unwrap();
        assert_eq!(selection.method.params(), &[HostType::Long]);

        let selection =
            select("T.scale", &[&double, &long], &[ScriptValue::Number(2.5)], &table).unwrap();
        assert_eq!(selection.method.params(), &[HostType::Double]);
    }

    #[test]
    fn ties_are_ambiguous() {
        let table = HandleTable::default();
        let a = method("pair", vec![HostType::Int, HostType::Double]);
        let b = method("pair", vec![HostType::Double, HostType::Int]);
        let err = select("T.pair", &[&a, &b], &ints(&[1, 1]), &table).unwrap_err();
        match err {
            BridgeError::AmbiguousOverload { target, candidates } => {
                assert_eq!(target, "T.pair");
                assert_eq!(candidates, vec!["pair(double, int)", "pair(int, double)"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn nothing_applicable_is_reported() {
        let table = HandleTable::default();
        let a = method("f", vec![HostType::Boolean]);
        let err = select("T.f", &[&a], &ints(&[1]), &table).unwrap_err();
        assert!(matches!(err, BridgeError::NoApplicableOverload { .. }));

        let err = select("T.f", &[&a], &[], &table).unwrap_err();
        assert!(matches!(err, BridgeError::NoApplicableOverload { .. }));
    }

    #[test]
    fn exact_signature_bypasses_ranking() {
        let table = HandleTable::default();
        let a = method("pair", vec![HostType::Int, HostType::Double]);
        let b = method("pair", vec![HostType::Double, HostType::Int]);
        let selection = select_exact(
            "T.pair",
            &[&a, &b],
            &[HostType::Double, HostType::Int],
            &ints(&[1, 1]),
            &table,
        )
        .unwrap();
        assert_eq!(
            selection.args,
            vec![HostValue::Double(1.0), HostValue::Int(1)]
        );

        let err = select_exact("T.pair", &[&a, &b], &[HostType::Int], &ints(&[1]), &table)
            .unwrap_err();
        assert!(matches!(err, BridgeError::NoApplicableOverload { .. }));
    }
}

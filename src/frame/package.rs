//! Symbol name parsing.
//!
//! Two symbol shapes show up on a stack:
//! - Rust paths: `krate::module::Type::method`, `<krate::Type as Trait>::method`
//! - slash/period paths: `github.com/org/pkg.(*Type).Method`

/// Prefixes that may precede the self type of a qualified Rust path.
const SELF_TYPE_PREFIXES: [&str; 6] = ["<", "&mut ", "&", "*const ", "*mut ", "dyn "];

/// Reduce a fully qualified symbol name to the package that owns it.
///
/// For Rust paths this is the crate, the first `::` segment of the (self)
/// type's path. For slash/period paths, trailing `.component`s are removed
/// while the last period follows the last slash, so dots in earlier path
/// segments survive.
pub fn package_from_symbol(symbol: &str) -> &str {
    if symbol.contains("::") {
        let path = strip_self_type_prefixes(symbol);
        return path.split("::").next().unwrap_or(path);
    }

    let mut package = symbol;
    while let Some(last_period) = package.rfind('.') {
        match package.rfind('/') {
            Some(last_slash) if last_period < last_slash => break,
            _ => package = &package[..last_period],
        }
    }
    package
}

/// The bare function name of a fully qualified symbol.
///
/// Closure markers are skipped, so a closure is named after its enclosing
/// function.
pub fn function_name(symbol: &str) -> &str {
    if symbol.contains("::") {
        return symbol
            .rsplit("::")
            .find(|segment| !segment.is_empty() && !segment.starts_with("{{"))
            .unwrap_or(symbol);
    }

    symbol.rsplit('.').next().unwrap_or(symbol)
}

fn strip_self_type_prefixes(mut symbol: &str) -> &str {
    while let Some(rest) = SELF_TYPE_PREFIXES
        .iter()
        .find_map(|prefix| symbol.strip_prefix(prefix))
    {
        symbol = rest;
    }
    symbol
}

use super::OperationKind;
use crate::url::ResourcePath;

/// Classifies a `(method, path)` pair into an operation kind.
///
/// A trailing `search` or `export` segment wins over the method. Methods
/// other than GET/POST/PUT/PATCH/DELETE are not operations.
pub fn classify_operation(method: &str, resource: &ResourcePath) -> Option<OperationKind> {
    match resource.last_segment().map(str::to_ascii_lowercase).as_deref() {
        Some("search") => return Some(OperationKind::Search),
        Some("export") => return Some(OperationKind::Export),
        _ => {}
    }

    match method.to_ascii_uppercase().as_str() {
        "GET" if resource.ends_with_param() => Some(OperationKind::Read),
        "GET" => Some(OperationKind::List),
        "POST" => Some(OperationKind::Create),
        "PUT" | "PATCH" => Some(OperationKind::Update),
        "DELETE" => Some(OperationKind::Delete),
        _ => None,
    }
}

use crate::parse::path::PathSegment;

/// Compiles the segments after a JSON field into a JSON path.
///
/// Every segment but the last is followed by `[*]` so nested arrays are
/// walked element by element; an explicit index replaces the wildcard.
/// With `open_end` the last segment is treated like the others, which is
/// how base paths of merged conditions are built. An open-ended empty path
/// walks the top-level elements of the document.
pub fn compile_path(segments: &[PathSegment], open_end: bool) -> String {
    let mut path = String::from("$");
    if segments.is_empty() && open_end {
        path.push_str("[*]");
    }
    for (i, segment) in segments.iter().enumerate() {
        push_key(&mut path, &segment.name);
        let last = i + 1 == segments.len();
        match segment.index {
            Some(index) => path.push_str(&format!("[{index}]")),
            None if !last || open_end => path.push_str("[*]"),
            None => {}
        }
    }
    path
}

fn push_key(path: &mut String, key: &str) {
    if is_identifier(key) {
        path.push('.');
        path.push_str(key);
    } else {
        path.push_str(".\"");
        for ch in key.chars() {
            if matches!(ch, '"' | '\\') {
                path.push('\\');
            }
            path.push(ch);
        }
        path.push('"');
    }
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

//! Absolute path construction for coordination-store nodes.

/// Join path segments into a clean absolute path.
///
/// Empty and `.` segments are dropped, `..` removes the previous segment, and
/// the result never carries a trailing slash. The root is `/`.
pub fn join_path<S: AsRef<str>>(parts: &[S]) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for part in parts {
        for seg in part.as_ref().split('/') {
            match seg {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                s => segments.push(s),
            }
        }
    }
    let mut out = String::with_capacity(segments.iter().map(|s| s.len() + 1).sum::<usize>().max(1));
    for seg in &segments {
        out.push('/');
        out.push_str(seg);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

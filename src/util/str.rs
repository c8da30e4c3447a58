pub fn split_and_trim(input: &str, delimiter: &str) -> Vec<String> {
    input
        .split(delimiter)
        .map(|v| v.trim())
        .map(String::from)
        .collect::<Vec<String>>()
}

/// Normalizes a host path to the forward-slash separators the workspace
/// index and HAMT use internally, regardless of the host OS.
pub fn to_forward_slash(path: &str) -> String {
    path.replace('\\', "/")
}

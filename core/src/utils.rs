use regex::Regex;

use crate::internal::*;

/// Expand `*` and `?` in the file name part of each path, sorted per pattern.
/// Paths without a wildcard are kept as they are, existing or not.
pub fn expand_wildcards(paths: &[impl AsRef<str>]) -> SrmcResult<Vec<PathBuf>> {
    let mut expanded = vec![];
    for path in paths {
        let path = path.as_ref();
        if !path.contains(['*', '?']) {
            expanded.push(PathBuf::from(path));
            continue;
        }
        let path = Path::new(path);
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let pattern = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("No file name in pattern {path:?}"))?;
        ensure!(
            !dir.to_string_lossy().contains(['*', '?']),
            "Wildcards are only supported in file names, not in {dir:?}"
        );
        let matcher = wildcard_regex(&pattern)?;
        let mut matches = vec![];
        for entry in walkdir::WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.with_context(|| format!("Listing {dir:?}"))?;
            if matcher.is_match(&entry.file_name().to_string_lossy()) {
                matches.push(entry.into_path());
            }
        }
        matches.sort();
        if matches.is_empty() {
            warn!("No file matches {path:?}");
        }
        expanded.extend(matches);
    }
    Ok(expanded)
}

fn wildcard_regex(pattern: &str) -> SrmcResult<Regex> {
    let mut re = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            c => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    re.push('$');
    Ok(Regex::new(&re)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expansion_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["input_1.npy", "input_0.npy", "input_10.npy", "other.bin", "input_x.bin"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let pattern = dir.path().join("input_*.npy").display().to_string();
        let plain = "kept/as/is.bin".to_string();
        let paths = expand_wildcards(&[pattern, plain]).unwrap();
        let names = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["input_0.npy", "input_1.npy", "input_10.npy", "is.bin"]);
        assert_eq!(paths[3], PathBuf::from("kept/as/is.bin"));
    }

    #[test]
    fn single_char_wildcard() {
        let re = wildcard_regex("in?.n*").unwrap();
        assert!(re.is_match("in1.npy"));
        assert!(!re.is_match("in12.npy"));
        assert!(!re.is_match("inx_npy"));
    }
}

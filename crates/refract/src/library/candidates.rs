//! Candidate file names for a requested library
//!
//! Absolute names are tried as given first and decorated afterwards.
//! Relative names are tried decorated first (`lib` prefix, platform suffix)
//! and bare last, so the system search path still gets a chance. A prefix or
//! suffix the name already carries is never added twice.

use std::path::{Path, MAIN_SEPARATOR};

use crate::config::LoaderConfig;

fn split_directory(file_name: &str) -> (&str, &str) {
    match file_name.rfind(|c| c == '/' || c == MAIN_SEPARATOR) {
        Some(position) => file_name.split_at(position + 1),
        None => ("", file_name),
    }
}

/// Ordered list of paths to try for `file_name`
pub fn candidate_paths(file_name: &str, version: Option<&str>, config: &LoaderConfig) -> Vec<String> {
    let absolute = Path::new(file_name).is_absolute();
    let mut prefixes = config.prefixes.clone();
    let mut suffixes = config.suffixes_for(version);
    if absolute {
        prefixes.insert(0, String::new());
        suffixes.insert(0, String::new());
    } else {
        prefixes.push(String::new());
        suffixes.push(String::new());
    }

    let (directory, stem) = split_directory(file_name);
    let mut forms: Vec<String> = Vec::new();
    for prefix in &prefixes {
        for suffix in &suffixes {
            if !prefix.is_empty() && stem.starts_with(prefix.as_str()) {
                continue;
            }
            if !suffix.is_empty() && stem.ends_with(suffix.as_str()) {
                continue;
            }
            let form = format!("{directory}{prefix}{stem}{suffix}");
            if !forms.contains(&form) {
                forms.push(form);
            }
        }
    }

    if absolute || config.search_paths.is_empty() {
        return forms;
    }

    let mut candidates: Vec<String> = config
        .search_paths
        .iter()
        .flat_map(|directory| {
            forms
                .iter()
                .map(move |form| directory.join(form).to_string_lossy().into_owned())
        })
        .collect();
    candidates.extend(forms);
    candidates
}

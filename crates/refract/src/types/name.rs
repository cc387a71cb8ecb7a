//! Type name normalization and display-name derivation
//!
//! Canonical names come from `core::any::type_name` (or a hand-made
//! descriptor). Before they are used as registry keys they are normalized so
//! that `int *` and `int*` resolve to the same record.

/// Normalize a type signature.
///
/// Whitespace runs collapse to one space, `*`, `&` and `)` are glued to the
/// preceding token and surrounding whitespace is trimmed.
pub fn normalize_signature(signature: &str) -> String {
    let mut out = String::with_capacity(signature.len());
    let mut pending_space = false;

    for ch in signature.trim().chars() {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if matches!(ch, '*' | '&' | ')') {
            // the space moves behind the token
            out.push(ch);
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(ch);
    }

    out
}

/// Remove every whitespace character
pub fn remove_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Replace the raw type name embedded in `source` with `custom`.
///
/// Matching ignores whitespace, while the spacing of `source` outside the
/// replaced region is preserved: `*const alloc::string::String` with raw
/// name `alloc::string::String` and custom name `String` becomes
/// `*const String`. Returns `source` unchanged when `raw` does not occur.
pub fn replace_raw_name(source: &str, raw: &str, custom: &str) -> String {
    let compact_raw = remove_whitespace(raw);
    if compact_raw.is_empty() {
        return source.to_string();
    }

    // byte offsets (into `source`) of every non-whitespace char
    let positions: Vec<(usize, char)> = source
        .char_indices()
        .filter(|(_, c)| !c.is_whitespace())
        .collect();
    let compact_src: String = positions.iter().map(|(_, c)| *c).collect();

    let Some(start) = compact_src.find(&compact_raw) else {
        return source.to_string();
    };

    // translate compact byte offsets into char counts
    let start_chars = compact_src[..start].chars().count();
    let raw_chars = compact_raw.chars().count();
    let (first_byte, _) = positions[start_chars];
    let (last_byte, last_char) = positions[start_chars + raw_chars - 1];
    let end_byte = last_byte + last_char.len_utf8();

    let mut result = String::with_capacity(source.len() + custom.len());
    result.push_str(&source[..first_byte]);
    result.push_str(custom);
    result.push_str(&source[end_byte..]);
    result
}

/// Rebuild a generic instantiation name from its argument display names.
///
/// `alloc::vec::Vec<alloc::string::String>` with argument names `["String"]`
/// becomes `alloc::vec::Vec<String>`. Returns `None` for non-generic names.
pub fn template_instance_name(name: &str, argument_names: &[String]) -> Option<String> {
    let start = name.find('<')?;
    let end = name.rfind('>')?;
    if end < start || argument_names.is_empty() {
        return None;
    }

    Some(format!(
        "{}<{}{}",
        &name[..start],
        argument_names.join(", "),
        &name[end..]
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_pointer_spacing() {
        assert_eq!(normalize_signature("int *"), "int*");
        assert_eq!(normalize_signature("int*"), "int*");
        assert_eq!(normalize_signature("  const int  & "), "const int&");
        assert_eq!(normalize_signature("int * const"), "int* const");
        assert_eq!(normalize_signature("void (*)(int)"), "void (*)(int)");
    }

    #[test]
    fn test_normalize_keeps_rust_names() {
        assert_eq!(normalize_signature("*const i32"), "*const i32");
        assert_eq!(normalize_signature("&'static str"), "&'static str");
        assert_eq!(
            normalize_signature("alloc::vec::Vec<alloc::string::String>"),
            "alloc::vec::Vec<alloc::string::String>"
        );
    }

    #[test]
    fn test_replace_raw_name() {
        assert_eq!(
            replace_raw_name("*const alloc::string::String", "alloc::string::String", "String"),
            "*const String"
        );
        assert_eq!(
            replace_raw_name("[alloc::string::String; 4]", "alloc::string::String", "String"),
            "[String; 4]"
        );
        assert_eq!(
            replace_raw_name("const basic_string<char> *", "basic_string< char >", "string"),
            "const string *"
        );
        assert_eq!(replace_raw_name("*const i32", "u8", "byte"), "*const i32");
    }

    #[test]
    fn test_template_instance_name() {
        assert_eq!(
            template_instance_name(
                "std::collections::hash::map::HashMap<alloc::string::String, i32>",
                &["String".to_string(), "i32".to_string()]
            )
            .as_deref(),
            Some("std::collections::hash::map::HashMap<String, i32>")
        );
        assert_eq!(template_instance_name("i32", &["x".to_string()]), None);
    }
}

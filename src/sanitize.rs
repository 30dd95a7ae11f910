/**
 * Filesystem-safe name tokens
 */

fn fold_accent(c: char) -> char {
    // Case-insensitive match, always folded to the lower-case letter.
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'u',
        'ç' | 'Ç' => 'c',
        other => other,
    }
}

/// Turn an arbitrary name into a token containing only `[A-Za-z0-9-]`.
///
/// Runs of whitespace or underscores collapse into one hyphen and common
/// accented Latin letters become their plain lower-case letter. Everything
/// else is dropped.
pub fn sanitize_for_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator = false;

    for c in name.chars() {
        if c.is_whitespace() || c == '_' {
            if !in_separator {
                out.push('-');
                in_separator = true;
            }
            continue;
        }
        in_separator = false;

        let c = fold_accent(c);
        if c.is_ascii_alphanumeric() || c == '-' {
            out.push(c);
        }
    }

    out
}

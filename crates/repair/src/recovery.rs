/// Line-level syntax recovery at a reported parse-error position.
///
/// Inspects only the single 1-indexed `line`: if its opening braces
/// outnumber its closing braces, the missing `}` are appended to that
/// line; then, independently, missing `)` for unbalanced parentheses —
/// braces are corrected before parentheses when both are short. Returns
/// `None` when the line is balanced or out of range. Never attempts
/// multi-line bracket balancing.
pub fn recover_line(code: &str, line: usize) -> Option<String> {
    if line == 0 {
        return None;
    }

    let mut lines: Vec<String> = code.split('\n').map(str::to_string).collect();
    let target = lines.get_mut(line - 1)?;

    let mut braces = 0i64;
    let mut parens = 0i64;
    let mut brace_deficit = 0usize;
    let mut paren_deficit = 0usize;
    for c in target.chars() {
        match c {
            '{' => braces += 1,
            '}' => braces -= 1,
            '(' => parens += 1,
            ')' => parens -= 1,
            _ => {}
        }
    }
    if braces > 0 {
        brace_deficit = braces as usize;
    }
    if parens > 0 {
        paren_deficit = parens as usize;
    }

    if brace_deficit == 0 && paren_deficit == 0 {
        return None;
    }

    let mut suffix = String::new();
    suffix.extend(std::iter::repeat('}').take(brace_deficit));
    suffix.extend(std::iter::repeat(')').take(paren_deficit));

    if target.ends_with('\r') {
        let at = target.len() - 1;
        target.insert_str(at, &suffix);
    } else {
        target.push_str(&suffix);
    }

    Some(lines.join("\n"))
}

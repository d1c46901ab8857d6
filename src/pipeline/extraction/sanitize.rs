/// Tidy extracted text before quality scoring and analysis.
/// Strips control characters, collapses runs of spaces to one, and
/// collapses three or more line breaks to two.
pub fn tidy_extracted_text(raw: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for line in raw.lines() {
        let cleaned: String = line.chars().filter(|c| !c.is_control()).collect();
        lines.push(collapse_spaces(cleaned.trim()));
    }

    // Allow at most one blank line between content lines.
    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    let mut blank_run = 0usize;
    for line in &lines {
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push(line);
    }

    // Drop leading/trailing blanks left by the pass above.
    while out.first().is_some_and(|l| l.is_empty()) {
        out.remove(0);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }

    out.join("\n")
}

fn collapse_spaces(line: &str) -> String {
    let mut result = String::with_capacity(line.len());
    let mut in_gap = false;
    for c in line.chars() {
        if c == ' ' || c == '\t' {
            if !in_gap {
                result.push(' ');
            }
            in_gap = true;
        } else {
            in_gap = false;
            result.push(c);
        }
    }
    result
}

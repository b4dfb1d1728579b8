/// Reduces a display location such as `"Dubai (DXB)"` to its IATA code.
/// Bare codes pass through upper-cased; anything else is returned trimmed.
pub fn extract_iata_code(location: &str) -> String {
    let trimmed = location.trim();

    if let (Some(open), Some(close)) = (trimmed.rfind('('), trimmed.rfind(')')) {
        if open < close {
            let inner = trimmed[open + 1..close].trim();
            if is_code(inner) {
                return inner.to_ascii_uppercase();
            }
        }
    }

    if is_code(trimmed) {
        return trimmed.to_ascii_uppercase();
    }
    trimmed.to_string()
}

fn is_code(candidate: &str) -> bool {
    candidate.len() == 3 && candidate.chars().all(|c| c.is_ascii_alphabetic())
}

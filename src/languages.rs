/// Display names for the language codes the tool is commonly pointed at.
/// The prompt reads better with "German" than "de"; unknown codes fall back
/// to the code itself.
pub fn language_name(code: &str) -> Option<&'static str> {
    match code {
        "en" => Some("English"),
        "de" => Some("German"),
        "es" => Some("Spanish"),
        "fr" => Some("French"),
        "it" => Some("Italian"),
        "ja" => Some("Japanese"),
        "ko" => Some("Korean"),
        "pt" => Some("Portuguese"),
        "zh" => Some("Chinese"),
        "ar" => Some("Arabic"),
        "cs" => Some("Czech"),
        "da" => Some("Danish"),
        "fi" => Some("Finnish"),
        "el" => Some("Greek"),
        "hi" => Some("Hindi"),
        "hu" => Some("Hungarian"),
        _ => None,
    }
}

pub fn display_name(code: &str) -> String {
    let normalized = code.trim().to_lowercase();
    language_name(&normalized)
        .map(str::to_string)
        .unwrap_or(normalized)
}

//! Detection prompt construction and the model-label -> type-id normalization
//! table shared by direct and proxy mode.

use crate::taxonomy::EntityTypeConfig;

/// Builds the detection prompt listing enabled types by display name and
/// description, instructing strict-JSON output.
pub fn build_detection_prompt(enabled_types: &[&EntityTypeConfig]) -> String {
    let mut listing = String::new();
    for t in enabled_types {
        let desc = t.description.as_deref().unwrap_or("");
        listing.push_str(&format!("- {} ({}): {}\n", t.id, t.name, desc));
    }
    format!(
        "Detect every visual region in this image matching one of the following types:\n{listing}\n\
Return JSON only, no prose, in exactly this shape:\n\
{{\"objects\": [{{\"type\": \"<type id>\", \"text\": \"<caption or empty string>\", \"box_2d\": [x1, y1, x2, y2]}}]}}"
    )
}

/// Many-to-one table mapping hundreds of model-chosen labels (Chinese and
/// English synonyms) to the stable type-id space of the registry. Grounded on
/// the source `glm_client.TYPE_NORMALIZATION_TABLE`.
fn normalization_table() -> &'static [(&'static str, &'static str)] {
    &[
        ("印章", "SEAL"),
        ("公章", "SEAL"),
        ("stamp", "SEAL"),
        ("seal", "SEAL"),
        ("official seal", "SEAL"),
        ("人脸", "FACE"),
        ("face", "FACE"),
        ("头像", "FACE"),
        ("签名", "SIGNATURE"),
        ("signature", "SIGNATURE"),
        ("手写签名", "SIGNATURE"),
        ("二维码", "QR_CODE"),
        ("qr code", "QR_CODE"),
        ("qrcode", "QR_CODE"),
        ("条形码", "BARCODE"),
        ("barcode", "BARCODE"),
        ("身份证号", "ID_CARD"),
        ("id card", "ID_CARD"),
        ("id number", "ID_CARD"),
        ("银行卡号", "BANK_CARD"),
        ("bank card", "BANK_CARD"),
        ("车牌", "LICENSE_PLATE"),
        ("license plate", "LICENSE_PLATE"),
        ("车牌号", "LICENSE_PLATE"),
        ("人物", "PERSON"),
        ("person", "PERSON"),
        ("姓名", "PERSON"),
        ("公司", "ORG"),
        ("组织", "ORG"),
        ("company", "ORG"),
        ("organization", "ORG"),
        ("地址", "ADDRESS"),
        ("address", "ADDRESS"),
        ("电话", "PHONE"),
        ("phone", "PHONE"),
        ("phone number", "PHONE"),
    ]
}

/// Normalizes a raw model label to a stable type id.
///
/// Tries an exact (case-insensitive) match against the table first, then
/// falls back to keyword matching on well-known substrings.
pub fn normalize_type_label(raw: &str) -> Option<&'static str> {
    let lower = raw.trim().to_lowercase();
    for (label, type_id) in normalization_table() {
        if lower == label.to_lowercase() {
            return Some(type_id);
        }
    }
    if lower.contains('章') || lower.contains("seal") || lower.contains("stamp") {
        return Some("SEAL");
    }
    if lower.contains("脸") || lower.contains("face") {
        return Some("FACE");
    }
    if lower.contains('签') || lower.contains("signature") {
        return Some("SIGNATURE");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_exact_match() {
        assert_eq!(normalize_type_label("公章"), Some("SEAL"));
        assert_eq!(normalize_type_label("Stamp"), Some("SEAL"));
    }

    #[test]
    fn test_normalize_keyword_fallback() {
        assert_eq!(normalize_type_label("红色印章区域"), Some("SEAL"));
    }

    #[test]
    fn test_normalize_unknown_returns_none() {
        assert_eq!(normalize_type_label("a bowl of soup"), None);
    }

    #[test]
    fn test_build_detection_prompt_lists_types() {
        let entry = EntityTypeConfig {
            id: "SEAL".into(),
            name: "公章".into(),
            category: crate::types::IdentifierCategory::Other,
            description: Some("official stamp".into()),
            examples: vec![],
            color: "#000".into(),
            regex_pattern: None,
            use_llm: true,
            enabled: true,
            order: 100,
            tag_template: None,
            risk_level: 3,
            is_preset: true,
        };
        let prompt = build_detection_prompt(&[&entry]);
        assert!(prompt.contains("SEAL"));
        assert!(prompt.contains("objects"));
    }
}

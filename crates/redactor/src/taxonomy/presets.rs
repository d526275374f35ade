//! Built-in entity type presets.
//!
//! Grounded on the preset table shipped with the source system: regex-backed
//! types (id card, phone, bank card, case number, email, license plate, date)
//! and LLM-only types (person, org, address, legal roles, amount, contract
//! number, witness). Returned as an ordered list of tables so
//! `TaxonomyRegistry::with_presets` can apply "newest-import-wins" merge
//! semantics across them.

use super::EntityTypeConfig;
use crate::types::IdentifierCategory;

fn entry(
    id: &str,
    name: &str,
    category: IdentifierCategory,
    description: &str,
    examples: &[&str],
    color: &str,
    regex_pattern: Option<&str>,
    use_llm: bool,
    tag_template: Option<&str>,
    order: i32,
    risk_level: u8,
) -> EntityTypeConfig {
    EntityTypeConfig {
        id: id.to_string(),
        name: name.to_string(),
        category,
        description: Some(description.to_string()),
        examples: examples.iter().map(|s| s.to_string()).collect(),
        color: color.to_string(),
        regex_pattern: regex_pattern.map(str::to_string),
        use_llm,
        enabled: true,
        order,
        tag_template: tag_template.map(str::to_string),
        risk_level,
        is_preset: true,
    }
}

/// The single built-in preset table. Modeled as a `Vec<Vec<_>>` of one table
/// today; additional imported tables (e.g. a jurisdiction-specific pack)
/// would append further `Vec`s here, each able to override earlier entries
/// by `id`.
pub fn preset_tables() -> Vec<Vec<EntityTypeConfig>> {
    vec![vec![
        entry(
            "ID_CARD",
            "身份证号",
            IdentifierCategory::Direct,
            "中国大陆居民身份证号码，18位或15位数字",
            &["110101199003071234", "11010119900307123X"],
            "#EF4444",
            Some(r"[1-9]\d{5}(?:19|20)\d{2}(?:0[1-9]|1[0-2])(?:0[1-9]|[12]\d|3[01])\d{3}[\dXx]"),
            false,
            Some("<编号[{index}].身份证.号码>"),
            10,
            5,
        ),
        entry(
            "PHONE",
            "电话号码",
            IdentifierCategory::Direct,
            "手机号码或座机号码",
            &["13812345678", "021-12345678", "010-87654321"],
            "#F97316",
            Some(r"1[3-9]\d{9}|(?:0\d{2,3}[-\s]?)?\d{7,8}"),
            false,
            Some("<电话[{index}].固定电话.号码>"),
            11,
            4,
        ),
        entry(
            "BANK_CARD",
            "银行卡号",
            IdentifierCategory::Direct,
            "银行借记卡或信用卡卡号，16-19位数字",
            &["6222021234567890123", "4367421234567890"],
            "#EC4899",
            Some(r"(?:62|4|5)\d{14,17}"),
            false,
            Some("<编号[{index}].银行卡.号码>"),
            12,
            5,
        ),
        entry(
            "CASE_NUMBER",
            "案件编号",
            IdentifierCategory::Quasi,
            "法院案件编号，如(2024)京01民初123号",
            &["(2024)京01民初123号", "(2023)沪0115民初9876号"],
            "#8B5CF6",
            Some(
                r"[\(（]\d{4}[\)）][京津沪渝冀豫云辽黑湘皖鲁新苏浙赣鄂桂甘晋蒙陕吉闽贵粤青藏川宁琼使领A-Za-z]{1,4}\d{0,4}[民刑行执破知赔财商][初终复再抗申裁监督撤]?\d+号",
            ),
            false,
            Some("<编号[{index}].案件编号.号码>"),
            13,
            3,
        ),
        entry(
            "EMAIL",
            "邮箱地址",
            IdentifierCategory::Direct,
            "电子邮件地址",
            &["user@example.com", "info@company.cn"],
            "#06B6D4",
            Some(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}"),
            false,
            Some("<邮箱[{index}].个人邮箱.地址>"),
            14,
            3,
        ),
        entry(
            "LICENSE_PLATE",
            "车牌号",
            IdentifierCategory::Quasi,
            "机动车号牌",
            &["京A12345", "沪B67890"],
            "#14B8A6",
            Some(r"[京津沪渝冀豫云辽黑湘皖鲁新苏浙赣鄂桂甘晋蒙陕吉闽贵粤青藏川宁琼使领][A-Z][A-Z0-9]{5,6}"),
            false,
            Some("<编号[{index}].车牌.号码>"),
            15,
            3,
        ),
        entry(
            "DATE",
            "日期",
            IdentifierCategory::Quasi,
            "具体日期信息",
            &["2024年1月15日", "2024-01-15"],
            "#84CC16",
            Some(r"\d{4}年\d{1,2}月\d{1,2}日|\d{4}[-/]\d{1,2}[-/]\d{1,2}"),
            false,
            Some("<日期/时间[{index}].具体日期.年月日>"),
            20,
            2,
        ),
        entry(
            "PERSON",
            "人名",
            IdentifierCategory::Direct,
            "自然人姓名，包括中文名、英文名、笔名、艺名等",
            &["张三", "李明华", "王小二", "John Smith"],
            "#3B82F6",
            None,
            true,
            Some("<人物[{index}].个人.姓名>"),
            1,
            4,
        ),
        entry(
            "ORG",
            "机构名称",
            IdentifierCategory::Quasi,
            "公司、组织、政府机构、法院等单位名称",
            &["北京某某科技有限公司", "某某市中级人民法院", "某某银行"],
            "#10B981",
            None,
            true,
            Some("<组织[{index}].企业.完整名称>"),
            2,
            2,
        ),
        entry(
            "ADDRESS",
            "地址",
            IdentifierCategory::Quasi,
            "详细地址，包括省市区街道门牌号",
            &["北京市朝阳区某某路123号", "上海市浦东新区某某街道某某小区1栋101室"],
            "#6366F1",
            None,
            true,
            Some("<地点[{index}].办公地址.完整地址>"),
            3,
            3,
        ),
        entry(
            "LEGAL_PARTY",
            "案件当事人",
            IdentifierCategory::Direct,
            "法律文书中的原告、被告、申请人、被申请人、上诉人、被上诉人等当事人称谓及姓名",
            &["原告张三", "被告某公司", "申请人李四", "被上诉人王五"],
            "#F59E0B",
            None,
            true,
            Some("<人物[{index}].当事人.姓名>"),
            4,
            4,
        ),
        entry(
            "LAWYER",
            "律师/代理人",
            IdentifierCategory::Direct,
            "委托代理人、辩护人、律师姓名及其所属律所",
            &["北京某某律师事务所律师张三", "委托代理人李四"],
            "#A855F7",
            None,
            true,
            Some("<人物[{index}].律师.姓名>"),
            5,
            3,
        ),
        entry(
            "JUDGE",
            "法官/书记员",
            IdentifierCategory::Direct,
            "审判长、审判员、书记员、人民陪审员姓名",
            &["审判长：张某某", "书记员：李某"],
            "#0EA5E9",
            None,
            true,
            Some("<人物[{index}].司法人员.姓名>"),
            6,
            3,
        ),
        entry(
            "AMOUNT",
            "金额",
            IdentifierCategory::Sensitive,
            "涉及的具体金额数目",
            &["人民币10万元", "500,000元", "叁拾万元整"],
            "#F43F5E",
            None,
            true,
            Some("<金额[{index}].合同金额.数值>"),
            7,
            3,
        ),
        entry(
            "CONTRACT_NO",
            "合同编号",
            IdentifierCategory::Quasi,
            "合同、协议的编号",
            &["合同编号：HT-2024-001", "协议编号：XY20240115"],
            "#64748B",
            None,
            true,
            Some("<编号[{index}].合同编号.代码>"),
            8,
            2,
        ),
        entry(
            "WITNESS",
            "证人",
            IdentifierCategory::Direct,
            "证人姓名",
            &["证人张某", "证人李某某"],
            "#78716C",
            None,
            true,
            None,
            9,
            3,
        ),
    ]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_tables_has_no_duplicate_ids_within_a_table() {
        for table in preset_tables() {
            let mut ids: Vec<&str> = table.iter().map(|e| e.id.as_str()).collect();
            let len_before = ids.len();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), len_before);
        }
    }

    #[test]
    fn test_every_preset_is_valid() {
        for table in preset_tables() {
            for entry in table {
                assert!(entry.validate().is_ok(), "{} failed validation", entry.id);
            }
        }
    }
}

use serde::{Deserialize, Serialize};

pub const WORK_CONTENT: &str = "작업내용:";
pub const RISK_FACTORS: &str = "위험요인:";
pub const SAFETY_MEASURES: &str = "안전대책:";
pub const REMARKS: &str = "전달사항:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    WorkContent,
    RiskFactors,
    SafetyMeasures,
    Remarks,
}

const PREFIXES: [(&str, Section); 4] = [
    (WORK_CONTENT, Section::WorkContent),
    (RISK_FACTORS, Section::RiskFactors),
    (SAFETY_MEASURES, Section::SafetyMeasures),
    (REMARKS, Section::Remarks),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TbmDraft {
    pub work_content: String,
    pub risk_factors: String,
    pub safety_measures: String,
    pub remarks: String,
    pub raw: String,
}

impl TbmDraft {
    fn field_mut(&mut self, section: Section) -> &mut String {
        match section {
            Section::WorkContent => &mut self.work_content,
            Section::RiskFactors => &mut self.risk_factors,
            Section::SafetyMeasures => &mut self.safety_measures,
            Section::Remarks => &mut self.remarks,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.work_content.is_empty()
            && self.risk_factors.is_empty()
            && self.safety_measures.is_empty()
            && self.remarks.is_empty()
    }
}

/// Strips markdown emphasis and list markers a model may put before a label.
fn strip_decoration(line: &str) -> &str {
    line.trim()
        .trim_start_matches(['-', '*', '#', '•'])
        .trim_start()
        .trim_start_matches("**")
}

fn match_prefix(line: &str) -> Option<(Section, &str)> {
    let line = strip_decoration(line);
    PREFIXES.iter().find_map(|(prefix, section)| {
        line.strip_prefix(prefix)
            .or_else(|| {
                // "작업내용 :" and "**작업내용**:" variants
                let label = prefix.trim_end_matches(':');
                line.strip_prefix(label).and_then(|rest| {
                    rest.trim_start_matches("**").trim_start().strip_prefix(':')
                })
            })
            .map(|rest| (*section, rest.trim_start_matches("**").trim()))
    })
}

/// Splits model output into TBM fields by their Korean labels. Lines before
/// the first label are ignored; unlabeled lines continue the current field.
pub fn parse_labeled_sections(text: &str) -> TbmDraft {
    let mut draft = TbmDraft {
        raw: text.to_string(),
        ..Default::default()
    };
    let mut current: Option<Section> = None;

    for line in text.lines() {
        if let Some((section, rest)) = match_prefix(line) {
            current = Some(section);
            let field = draft.field_mut(section);
            if !rest.is_empty() {
                if !field.is_empty() {
                    field.push('\n');
                }
                field.push_str(rest);
            }
            continue;
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(section) = current {
            let field = draft.field_mut(section);
            if !field.is_empty() {
                field.push('\n');
            }
            field.push_str(line);
        }
    }

    draft
}

use thiserror::Error;

use crate::agents::Role;

const CARDIOLOGIST_TEMPLATE: &str = "
Act like a cardiologist. You will receive a medical report of a patient.

Task:
- Review the patient's cardiac workup, including ECG, blood tests, Holter monitor results, and echocardiogram.

Focus:
- Determine if there are any subtle signs of cardiac issues that could explain the patient’s symptoms.
- Rule out underlying heart conditions (arrhythmias, structural abnormalities) that might be missed on routine testing.

Recommendation:
- Provide guidance on further cardiac testing or monitoring if needed.
- Suggest potential management strategies if a cardiac issue is identified.

Return ONLY:
1) Possible cardiac causes
2) Recommended next steps

Medical Report:
{medical_report}
";

const PSYCHOLOGIST_TEMPLATE: &str = "
Act like a psychologist. You will receive a patient's report.

Task:
- Review the patient's report and provide a psychological assessment.

Focus:
- Identify potential mental health issues (anxiety, depression, trauma) affecting the patient.

Recommendation:
- Provide guidance on addressing these concerns (therapy, counseling, interventions).

Return ONLY:
1) Possible mental health issues
2) Recommended next steps

Patient's Report:
{medical_report}
";

const PULMONOLOGIST_TEMPLATE: &str = "
Act like a pulmonologist. You will receive a patient's report.

Task:
- Review the patient's report and provide a pulmonary assessment.

Focus:
- Identify potential respiratory issues (asthma, COPD, lung infections) affecting breathing.

Recommendation:
- Suggest next steps (PFTs, imaging, other interventions).

Return ONLY:
1) Possible respiratory issues
2) Recommended next steps

Patient's Report:
{medical_report}
";

const MULTIDISCIPLINARY_TEAM_TEMPLATE: &str = "
Act like a multidisciplinary team of healthcare professionals.

You will receive a medical report of a patient visited by a Cardiologist, Psychologist, and Pulmonologist.

Task:
- Review the reports from the Cardiologist, Psychologist, and Pulmonologist
- Analyze them and come up with a list of 3 possible health issues
- For each issue, provide a short reason

Return ONLY bullet points (exactly 3).

Cardiologist Report:
{cardiologist_report}

Psychologist Report:
{psychologist_report}

Pulmonologist Report:
{pulmonologist_report}
";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("missing value for placeholder '{0}'")]
    MissingVariable(String),
    #[error("malformed template near byte {0}")]
    Malformed(usize),
}

/// Immutable prompt text with `{name}` placeholders. `{{` and `}}` render as literal braces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    template: &'static str,
}

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Text(&'a str),
    Placeholder(&'a str),
}

impl PromptTemplate {
    pub const fn from_template(template: &'static str) -> Self {
        Self { template }
    }

    pub const fn for_role(role: Role) -> Self {
        match role {
            Role::Cardiologist => Self::from_template(CARDIOLOGIST_TEMPLATE),
            Role::Psychologist => Self::from_template(PSYCHOLOGIST_TEMPLATE),
            Role::Pulmonologist => Self::from_template(PULMONOLOGIST_TEMPLATE),
            Role::MultidisciplinaryTeam => Self::from_template(MULTIDISCIPLINARY_TEAM_TEMPLATE),
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.template
    }

    /// Placeholder names in order of first appearance.
    pub fn placeholders(&self) -> Result<Vec<&'static str>, TemplateError> {
        let mut names = Vec::new();
        for segment in parse(self.template)? {
            if let Segment::Placeholder(name) = segment {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }

    /// Substitutes `values` into the template. Values are inserted verbatim and never
    /// re-scanned for placeholders; unused values are ignored.
    pub fn format(&self, values: &[(&str, &str)]) -> Result<String, TemplateError> {
        let segments = parse(self.template)?;
        let mut rendered = String::with_capacity(
            self.template.len() + values.iter().map(|(_, value)| value.len()).sum::<usize>(),
        );

        for segment in segments {
            match segment {
                Segment::Text(text) => rendered.push_str(text),
                Segment::Placeholder(name) => {
                    let value = values
                        .iter()
                        .find(|(key, _)| *key == name)
                        .map(|(_, value)| *value)
                        .ok_or_else(|| TemplateError::MissingVariable(name.to_string()))?;
                    rendered.push_str(value);
                }
            }
        }

        Ok(rendered)
    }
}

fn parse(template: &str) -> Result<Vec<Segment<'_>>, TemplateError> {
    let bytes = template.as_bytes();
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut idx = 0;

    while idx < bytes.len() {
        match bytes[idx] {
            b'{' if bytes.get(idx + 1) == Some(&b'{') => {
                // keep one brace of the pair
                push_text(&mut segments, template, literal_start, idx + 1);
                idx += 2;
                literal_start = idx;
            }
            b'}' if bytes.get(idx + 1) == Some(&b'}') => {
                push_text(&mut segments, template, literal_start, idx + 1);
                idx += 2;
                literal_start = idx;
            }
            b'{' => {
                push_text(&mut segments, template, literal_start, idx);
                let rest = &template[idx + 1..];
                let end = rest.find('}').ok_or(TemplateError::Malformed(idx))?;
                let name = &rest[..end];
                let valid = !name.is_empty()
                    && name
                        .chars()
                        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
                if !valid {
                    return Err(TemplateError::Malformed(idx));
                }
                segments.push(Segment::Placeholder(name));
                idx += end + 2;
                literal_start = idx;
            }
            b'}' => return Err(TemplateError::Malformed(idx)),
            _ => idx += 1,
        }
    }

    push_text(&mut segments, template, literal_start, bytes.len());
    Ok(segments)
}

fn push_text<'a>(segments: &mut Vec<Segment<'a>>, template: &'a str, from: usize, to: usize) {
    if from < to {
        segments.push(Segment::Text(&template[from..to]));
    }
}

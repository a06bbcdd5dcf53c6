//! Deterministic report construction and rendering.
//!
//! A [`Report`] is an ordered sequence of typed blocks built from a finding
//! and its raw analysis text. Rendering is a pure function: identical
//! inputs with the same generation time produce byte-identical output.
//! The serialized form is markdown paginated into fixed-height pages
//! separated by form feeds.

use chrono::{DateTime, SecondsFormat, Utc};
use guardpost_capabilities::Finding;

/// Analysis section headers rendered as primary headings.
pub const PRIMARY_HEADINGS: [&str; 3] =
    ["Analysis:", "Remediation Actions:", "Recommended Actions:"];

/// Analysis section headers rendered as secondary headings.
pub const SECONDARY_HEADINGS: [&str; 3] =
    ["Entities Involved:", "Security Group Impact:", "Attempt Status:"];

/// File extension for rendered reports.
pub const REPORT_EXTENSION: &str = "md";

/// Content type for rendered reports.
pub const REPORT_CONTENT_TYPE: &str = "text/markdown";

/// Lines per rendered page.
const PAGE_HEIGHT: usize = 48;

/// Page separator in the serialized byte stream.
const PAGE_BREAK: &str = "\u{000C}\n";

const REPORT_TITLE: &str = "GuardDuty Finding Report";

const CONCLUSION_HEADING: &str = "Conclusion and Recommended Actions";

const CONCLUSION_TEXT: &str = "The above insights and recommendations provide detailed \
     information on mitigating the identified threat. Please ensure the recommended \
     security actions are promptly applied to minimize future risks.";

/// Console deep link to the finding in the detection service. The template
/// is load-bearing: consumers bookmark and diff these URLs.
pub fn guardduty_console_url(region: &str, finding_id: &str) -> String {
    format!(
        "https://{region}.console.aws.amazon.com/guardduty/home?region={region}#/findings?\
         search=id%3D{finding_id}&macros=current"
    )
}

/// Console deep link to the finding in the investigation service.
pub fn detective_console_url(region: &str, finding_id: &str) -> String {
    format!(
        "https://{region}.console.aws.amazon.com/detective/home?region={region}#search?\
         searchType=Finding&searchText={finding_id}"
    )
}

/// Weight of a heading block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingWeight {
    /// Top-level document section.
    Section,
    /// Recognized analysis header, primary set.
    Primary,
    /// Recognized analysis header, secondary set.
    Secondary,
}

/// One typed block of the report.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Document title line.
    Title(String),
    /// Generation-time metadata line.
    Metadata(String),
    /// Key/value line in the finding summary.
    KeyValue { key: String, value: String },
    /// Labeled hyperlink.
    Link { label: String, url: String },
    /// Headed section marker.
    Heading { text: String, weight: HeadingWeight },
    /// Trimmed body paragraph.
    Paragraph(String),
    /// Blank separator line.
    Separator,
    /// Fixed closing paragraph.
    Conclusion(String),
}

/// An ordered sequence of typed blocks. Rendering-time only; nothing here
/// is persisted except through `to_bytes`.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub blocks: Vec<Block>,
}

/// A fixed-height page of rendered lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub lines: Vec<String>,
}

impl Report {
    /// Build a report from a finding and its raw analysis text.
    ///
    /// `generated_at` is a parameter rather than a clock read so the whole
    /// build-and-render path is deterministic.
    pub fn build(finding: &Finding, analysis_text: &str, generated_at: DateTime<Utc>) -> Self {
        let mut blocks = Vec::new();
        let type_label = field_or_na(&finding.finding_type);

        blocks.push(Block::Title(REPORT_TITLE.to_string()));
        blocks.push(Block::Title(type_label.clone()));
        blocks.push(Block::Metadata(format!(
            "Generated on: {}",
            generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        )));
        blocks.push(Block::Separator);

        blocks.push(Block::Heading {
            text: "GuardDuty Finding Details".to_string(),
            weight: HeadingWeight::Section,
        });
        blocks.push(key_value("Finding Type", type_label));
        blocks.push(key_value("Finding ID", finding.id.clone()));
        blocks.push(key_value("Severity", format_severity(finding.severity)));
        blocks.push(key_value("Account ID", field_or_na(&finding.account_id)));
        blocks.push(key_value("Region", field_or_na(&finding.region)));
        blocks.push(Block::Separator);

        let region = finding.region.as_deref().unwrap_or("us-east-1");
        blocks.push(Block::Heading {
            text: "Relevant Links".to_string(),
            weight: HeadingWeight::Section,
        });
        blocks.push(Block::Link {
            label: "View Finding in GuardDuty Console".to_string(),
            url: guardduty_console_url(region, &finding.id),
        });
        blocks.push(Block::Link {
            label: "View Finding in Detective Console".to_string(),
            url: detective_console_url(region, &finding.id),
        });
        blocks.push(Block::Separator);

        blocks.push(Block::Heading {
            text: "AI Insights".to_string(),
            weight: HeadingWeight::Section,
        });
        for group in paragraph_groups(analysis_text) {
            for line in group {
                blocks.push(classify_line(line));
            }
            blocks.push(Block::Separator);
        }

        blocks.push(Block::Heading {
            text: CONCLUSION_HEADING.to_string(),
            weight: HeadingWeight::Section,
        });
        blocks.push(Block::Conclusion(CONCLUSION_TEXT.to_string()));

        Report { blocks }
    }

    /// Render all blocks to markdown lines, unpaginated.
    pub fn to_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for block in &self.blocks {
            match block {
                Block::Title(text) => {
                    lines.push(format!("# {}", text));
                    lines.push(String::new());
                }
                Block::Metadata(text) => {
                    lines.push(format!("_{}_", text));
                    lines.push(String::new());
                }
                Block::KeyValue { key, value } => {
                    lines.push(format!("- **{}:** {}", key, value));
                }
                Block::Link { label, url } => {
                    lines.push(format!("[{}]({})", label, url));
                }
                Block::Heading { text, weight } => {
                    let marker = match weight {
                        HeadingWeight::Section => "##",
                        HeadingWeight::Primary => "###",
                        HeadingWeight::Secondary => "####",
                    };
                    lines.push(format!("{} {}", marker, text));
                    lines.push(String::new());
                }
                Block::Paragraph(text) | Block::Conclusion(text) => {
                    lines.push(text.clone());
                    lines.push(String::new());
                }
                Block::Separator => {
                    lines.push(String::new());
                }
            }
        }
        lines
    }

    /// Paginate the rendered lines into fixed-height pages.
    pub fn paginate(&self) -> Vec<Page> {
        let lines = self.to_lines();
        if lines.is_empty() {
            return vec![Page { lines: Vec::new() }];
        }
        lines
            .chunks(PAGE_HEIGHT)
            .map(|chunk| Page {
                lines: chunk.to_vec(),
            })
            .collect()
    }

    /// Serialize to the final byte stream: pages joined by form-feed breaks.
    pub fn to_bytes(&self) -> Vec<u8> {
        let pages: Vec<String> = self
            .paginate()
            .into_iter()
            .map(|page| {
                let mut text = page.lines.join("\n");
                text.push('\n');
                text
            })
            .collect();
        pages.join(PAGE_BREAK).into_bytes()
    }
}

fn key_value(key: &str, value: String) -> Block {
    Block::KeyValue {
        key: key.to_string(),
        value,
    }
}

fn field_or_na(field: &Option<String>) -> String {
    field.clone().unwrap_or_else(|| "N/A".to_string())
}

fn format_severity(severity: f64) -> String {
    if severity.fract() == 0.0 {
        format!("{:.1}", severity)
    } else {
        severity.to_string()
    }
}

/// Split analysis text into paragraph groups on blank-line boundaries.
///
/// A line containing only whitespace separates groups; runs of blank lines
/// never produce empty groups.
fn paragraph_groups(text: &str) -> Vec<Vec<&str>> {
    let mut groups = Vec::new();
    let mut current = Vec::new();
    for line in text.trim().lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                groups.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

/// Classify one line of analysis text: an exact case-sensitive match
/// against the header vocabulary becomes a heading, anything else a
/// trimmed body paragraph.
fn classify_line(line: &str) -> Block {
    let trimmed = line.trim();
    if PRIMARY_HEADINGS.contains(&trimmed) {
        Block::Heading {
            text: trimmed.to_string(),
            weight: HeadingWeight::Primary,
        }
    } else if SECONDARY_HEADINGS.contains(&trimmed) {
        Block::Heading {
            text: trimmed.to_string(),
            weight: HeadingWeight::Secondary,
        }
    } else {
        Block::Paragraph(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_finding() -> Finding {
        Finding {
            id: "F1".to_string(),
            severity: 6.0,
            finding_type: Some("UnauthorizedAccess:EC2/SSHBruteForce".to_string()),
            account_id: Some("111122223333".to_string()),
            region: Some("us-east-1".to_string()),
            detail: json!({}),
        }
    }

    #[test]
    fn console_urls_match_the_fixed_templates() {
        assert_eq!(
            guardduty_console_url("us-east-1", "F1"),
            "https://us-east-1.console.aws.amazon.com/guardduty/home?region=us-east-1\
             #/findings?search=id%3DF1&macros=current"
        );
        assert_eq!(
            detective_console_url("eu-west-2", "abc"),
            "https://eu-west-2.console.aws.amazon.com/detective/home?region=eu-west-2\
             #search?searchType=Finding&searchText=abc"
        );
    }

    #[test]
    fn recognized_headers_become_headings_with_the_right_weight() {
        for header in PRIMARY_HEADINGS {
            match classify_line(header) {
                Block::Heading { weight, .. } => assert_eq!(weight, HeadingWeight::Primary),
                other => panic!("{header:?} rendered as {other:?}"),
            }
        }
        for header in SECONDARY_HEADINGS {
            match classify_line(header) {
                Block::Heading { weight, .. } => assert_eq!(weight, HeadingWeight::Secondary),
                other => panic!("{header:?} rendered as {other:?}"),
            }
        }
    }

    #[test]
    fn unrecognized_lines_are_paragraphs() {
        assert!(matches!(classify_line("Rotate keys."), Block::Paragraph(_)));
        // Case matters; a lowercased header is just text.
        assert!(matches!(classify_line("analysis:"), Block::Paragraph(_)));
        // So does an extra suffix.
        assert!(matches!(
            classify_line("Analysis: complete"),
            Block::Paragraph(_)
        ));
    }

    #[test]
    fn header_match_tolerates_surrounding_whitespace() {
        assert!(matches!(
            classify_line("  Analysis:  "),
            Block::Heading {
                weight: HeadingWeight::Primary,
                ..
            }
        ));
    }

    #[test]
    fn paragraph_groups_split_on_blank_lines() {
        let text = "Analysis:\nBreach detected.\n\nRemediation Actions:\nRotate keys.";
        let groups = paragraph_groups(text);
        assert_eq!(
            groups,
            vec![
                vec!["Analysis:", "Breach detected."],
                vec!["Remediation Actions:", "Rotate keys."],
            ]
        );
    }

    #[test]
    fn runs_of_blank_lines_make_no_empty_groups() {
        let groups = paragraph_groups("one\n\n   \n\ntwo");
        assert_eq!(groups, vec![vec!["one"], vec!["two"]]);
    }

    #[test]
    fn severity_formats_with_one_decimal_when_integral() {
        assert_eq!(format_severity(6.0), "6.0");
        assert_eq!(format_severity(3.9), "3.9");
    }

    #[test]
    fn missing_fields_render_as_na() {
        let finding = Finding {
            id: "F1".to_string(),
            severity: 6.0,
            finding_type: None,
            account_id: None,
            region: None,
            detail: json!({}),
        };
        let report = Report::build(&finding, "", Utc::now());
        let lines = report.to_lines();
        assert!(lines.iter().any(|l| l == "- **Finding Type:** N/A"));
        assert!(lines.iter().any(|l| l == "- **Account ID:** N/A"));
        assert!(lines.iter().any(|l| l == "- **Region:** N/A"));
    }

    #[test]
    fn long_reports_paginate_at_fixed_height() {
        let analysis = (0..200)
            .map(|i| format!("line {}\n\n", i))
            .collect::<String>();
        let report = Report::build(&sample_finding(), &analysis, Utc::now());
        let pages = report.paginate();

        assert!(pages.len() > 1);
        for page in &pages[..pages.len() - 1] {
            assert_eq!(page.lines.len(), PAGE_HEIGHT);
        }

        let bytes = report.to_bytes();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.matches('\u{000C}').count(), pages.len() - 1);
    }
}

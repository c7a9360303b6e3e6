use crate::utils::error::{Result, WorkflowError};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// 模板中的佔位符
pub mod placeholders {
    pub const BATHYMETRY: &str = "BATHYMETRY";
    pub const SCENARIO: &str = "SCENARIO";
    pub const SCENARIO_NAME: &str = "SCENARIO_NAME";
    pub const HYSEA_OUTNAME: &str = "HYSEA_OUTNAME";
    pub const DEFORMATION_FILE: &str = "DEFORMATION_FILE";
    pub const POIS_FILE: &str = "POIS_FILE";
}

/// 一次替換的結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub text: String,
    pub counts: HashMap<String, usize>,
}

impl Substitution {
    /// 沒有出現在模板中的佔位符，依宣告順序
    pub fn missing<'a>(&self, tokens: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        tokens
            .into_iter()
            .filter(|token| self.counts.get(*token).copied().unwrap_or(0) == 0)
            .map(str::to_string)
            .collect()
    }
}

/// 單次掃描替換所有佔位符。
///
/// 每個位置取最長的佔位符 (`SCENARIO_NAME` 優先於 `SCENARIO`)，替換後的值不會再被掃描，
/// 因此結果與佔位符的順序無關。
pub fn substitute(text: &str, replacements: &[(&str, &str)]) -> Result<Substitution> {
    let mut counts: HashMap<String, usize> = replacements
        .iter()
        .map(|(token, _)| (token.to_string(), 0))
        .collect();

    if replacements.is_empty() {
        return Ok(Substitution {
            text: text.to_string(),
            counts,
        });
    }

    let values: HashMap<&str, &str> = replacements.iter().copied().collect();
    let mut tokens: Vec<&str> = values.keys().copied().collect();
    // regex 的交替是 leftmost-first，長的放前面才會得到最長匹配
    tokens.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let pattern = tokens
        .iter()
        .map(|token| regex::escape(token))
        .collect::<Vec<_>>()
        .join("|");
    let re = Regex::new(&pattern).map_err(|e| WorkflowError::InvalidConfigValueError {
        field: "placeholders".to_string(),
        value: pattern.clone(),
        reason: e.to_string(),
    })?;

    let rendered = re.replace_all(text, |caps: &Captures| {
        let token = &caps[0];
        if let Some(count) = counts.get_mut(token) {
            *count += 1;
        }
        values.get(token).copied().unwrap_or(token).to_string()
    });

    Ok(Substitution {
        text: rendered.into_owned(),
        counts,
    })
}

#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub path: PathBuf,
    pub counts: HashMap<String, usize>,
    pub missing: Vec<String>,
}

/// 將模板複製到目標位置並替換佔位符
#[derive(Debug, Clone, Copy)]
pub struct TemplateRenderer {
    strict: bool,
}

impl TemplateRenderer {
    /// `strict` 為 true 時，缺少任何宣告的佔位符都視為錯誤
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn ensure_template(&self, template: &Path) -> Result<()> {
        if template.is_file() {
            Ok(())
        } else {
            Err(WorkflowError::TemplateNotFound {
                path: template.to_path_buf(),
            })
        }
    }

    pub fn render(
        &self,
        template: &Path,
        destination: &Path,
        replacements: &[(&str, &str)],
    ) -> Result<RenderOutcome> {
        self.ensure_template(template)?;

        let content = fs::read_to_string(template)?;
        let substitution = substitute(&content, replacements)?;
        let missing = substitution.missing(replacements.iter().map(|(token, _)| *token));

        if let Some(token) = missing.first() {
            if self.strict {
                return Err(WorkflowError::PlaceholderMissing {
                    template: template.to_path_buf(),
                    token: token.clone(),
                });
            }
            for token in &missing {
                tracing::warn!(
                    "⚠️ Placeholder '{}' not found in template {}",
                    token,
                    template.display()
                );
            }
        }

        // 先複製再覆寫內容，保留模板的檔案權限
        fs::copy(template, destination)?;
        fs::write(destination, substitution.text.as_bytes())?;

        for (token, value) in replacements {
            tracing::debug!(
                "📝 {}: {} -> {} ({} occurrences)",
                destination.display(),
                token,
                value,
                substitution.counts.get(*token).copied().unwrap_or(0)
            );
        }

        Ok(RenderOutcome {
            path: destination.to_path_buf(),
            counts: substitution.counts,
            missing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::placeholders::*;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_replaces_every_occurrence() {
        let result = substitute(
            "topo = 'BATHYMETRY'\nbackup = 'BATHYMETRY'\n",
            &[(BATHYMETRY, "messina.tt3")],
        )
        .unwrap();

        assert_eq!(result.text, "topo = 'messina.tt3'\nbackup = 'messina.tt3'\n");
        assert_eq!(result.counts[BATHYMETRY], 2);
    }

    #[test]
    fn test_longest_token_wins() {
        let text = "name=SCENARIO_NAME file=SCENARIO";
        let forward = substitute(text, &[(SCENARIO, "demo.tt3"), (SCENARIO_NAME, "demo")]).unwrap();
        let backward = substitute(text, &[(SCENARIO_NAME, "demo"), (SCENARIO, "demo.tt3")]).unwrap();

        assert_eq!(forward.text, "name=demo file=demo.tt3");
        assert_eq!(forward, backward);
        assert_eq!(forward.counts[SCENARIO], 1);
        assert_eq!(forward.counts[SCENARIO_NAME], 1);
    }

    #[test]
    fn test_inserted_values_are_not_rescanned() {
        let result = substitute(
            "BATHYMETRY DEFORMATION_FILE",
            &[(BATHYMETRY, "DEFORMATION_FILE"), (DEFORMATION_FILE, "deform.nc")],
        )
        .unwrap();

        assert_eq!(result.text, "DEFORMATION_FILE deform.nc");
    }

    #[test]
    fn test_token_only_inside_longer_token_is_missing() {
        let result = substitute("SCENARIO_NAME", &[(SCENARIO, "x")]).unwrap();
        // SCENARIO_NAME 不在替換表內，SCENARIO 仍會在其前綴被替換
        assert_eq!(result.text, "x_NAME");

        let result = substitute("SCENARIO_NAME", &[(SCENARIO, "x"), (SCENARIO_NAME, "y")]).unwrap();
        assert_eq!(result.text, "y");
        assert_eq!(result.missing([SCENARIO, SCENARIO_NAME]), vec![SCENARIO.to_string()]);
    }

    #[test]
    fn test_render_without_placeholders_is_a_copy() {
        let temp_dir = TempDir::new().unwrap();
        let template = temp_dir.path().join("plain.txt");
        let destination = temp_dir.path().join("rendered.txt");
        let content = "no tokens here\nlower-case bathymetry is not a token\n";
        fs::write(&template, content).unwrap();

        let outcome = TemplateRenderer::new(false)
            .render(&template, &destination, &[(BATHYMETRY, "x.nc"), (POIS_FILE, "p.txt")])
            .unwrap();

        assert_eq!(fs::read_to_string(&destination).unwrap(), content);
        assert_eq!(outcome.missing, vec![BATHYMETRY.to_string(), POIS_FILE.to_string()]);
    }

    #[test]
    fn test_strict_render_rejects_missing_placeholder() {
        let temp_dir = TempDir::new().unwrap();
        let template = temp_dir.path().join("setrun_template.py");
        let destination = temp_dir.path().join("setrun.py");
        fs::write(&template, "topofiles.append([3, 1, 1, 0., 1.e10, 'BATHYMETRY'])\n").unwrap();

        let err = TemplateRenderer::new(true)
            .render(&template, &destination, &[(BATHYMETRY, "b.tt3"), (SCENARIO, "s.tt3")])
            .unwrap_err();

        match err {
            WorkflowError::PlaceholderMissing { token, .. } => assert_eq!(token, SCENARIO),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!destination.exists());
    }

    #[test]
    fn test_missing_template() {
        let temp_dir = TempDir::new().unwrap();
        let err = TemplateRenderer::new(true)
            .render(
                &temp_dir.path().join("absent.txt"),
                &temp_dir.path().join("out.txt"),
                &[],
            )
            .unwrap_err();

        assert!(matches!(err, WorkflowError::TemplateNotFound { .. }));
    }
}

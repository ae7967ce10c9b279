//! Question generation collaborator. The template source is a stand-in for a
//! generative backend; callers only see [`QuestionSource`].

use serde::Deserialize;

use crate::store::NewQuestion;

/// What the candidate is preparing for.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionRequest {
  pub role: String,
  pub job_title: String,
  #[serde(default = "default_level")]
  pub level: String,
  #[serde(default)]
  pub stack: Vec<String>,
  #[serde(default = "default_difficulty")]
  pub difficulty: String,
  #[serde(default)]
  pub company: String,
}

fn default_level() -> String {
  "junior".to_string()
}

fn default_difficulty() -> String {
  "medium".to_string()
}

pub trait QuestionSource: Send + Sync {
  fn generate(&self, req: &SessionRequest) -> Vec<NewQuestion>;
}

/// Fixed Korean question templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateQuestions;

/// Rubric for questions about incidents and root-cause work.
const CAUSE_RUBRIC: [&str; 3] = ["원인-해결", "구체성", "영향도"];
const GENERAL_RUBRIC: [&str; 2] = ["핵심키워드", "경험근거"];
/// Template positions that use [`CAUSE_RUBRIC`].
const CAUSE_QUESTIONS: [usize; 2] = [1, 5];

impl QuestionSource for TemplateQuestions {
  fn generate(&self, req: &SessionRequest) -> Vec<NewQuestion> {
    let stack = if req.stack.is_empty() {
      "주요 기술".to_string()
    } else {
      req.stack.join(", ")
    };
    let templates = [
      "자기소개 및 최근 프로젝트에서 맡은 역할을 설명해 주세요.".to_string(),
      "해당 직무에서 가장 중요하다고 생각하는 역량은 무엇이며, 어떻게 증명하셨나요?".to_string(),
      "문제가 발생했을 때 원인 분석부터 해결까지의 과정을 구체적으로 설명해 주세요.".to_string(),
      format!("{} 중 하나를 선택해 내부 동작 원리를 설명해 주세요.", stack),
      "동료와의 협업에서 갈등이 있었던 경험과 해결 방법을 공유해 주세요.".to_string(),
      "서비스의 안정성과 확장성을 위해 어떤 설계를 했는지 사례를 들어 설명해 주세요.".to_string(),
      "장애나 성능 이슈를 발견했을 때 모니터링/로깅으로 어떻게 추적했나요?".to_string(),
      "최근 학습하거나 흥미롭게 본 기술/논문 한 가지를 설명해 주세요.".to_string(),
    ];

    templates
      .into_iter()
      .enumerate()
      .map(|(i, text)| {
        let rubric: &[&str] = if CAUSE_QUESTIONS.contains(&i) {
          &CAUSE_RUBRIC
        } else {
          &GENERAL_RUBRIC
        };
        NewQuestion {
          text,
          rubric_keywords: rubric.iter().map(|s| s.to_string()).collect(),
          difficulty: req.difficulty.clone(),
        }
      })
      .collect()
  }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vacancy {
    pub id: i64,
    pub title: String,
    pub employment_type: Option<String>,
    pub description_tasks: Option<String>,
    pub description_conditions: Option<String>,
    pub ideal_profile: Option<String>,
    pub questions: JsonValue,
    pub soft_questions: JsonValue,
    pub is_active: bool,
    pub created_by: i64,
    pub ai_metadata: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vacancy {
    pub fn question_list(&self) -> Result<Vec<Question>, serde_json::Error> {
        serde_json::from_value(self.questions.clone())
    }

    pub fn soft_question_list(&self) -> Result<Vec<Question>, serde_json::Error> {
        serde_json::from_value(self.soft_questions.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    #[default]
    Text,
    Number,
    Choice,
    Boolean,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Question {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub kind: QuestionKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<String>,
}

const MAX_TEXT_ANSWER_CHARS: usize = 2000;

/// Checks a submitted answer object against a vacancy's question list:
/// every required question answered, every answer typed correctly, no keys
/// outside the list.
pub fn validate_answers(
    questions: &[Question],
    answers: &serde_json::Map<String, JsonValue>,
) -> Result<(), String> {
    for question in questions {
        match answers.get(&question.id) {
            None | Some(JsonValue::Null) => {
                if question.required {
                    return Err(format!(
                        "Missing answer for required question '{}'",
                        question.text
                    ));
                }
            }
            Some(value) => check_answer(question, value)?,
        }
    }
    for key in answers.keys() {
        if !questions.iter().any(|q| &q.id == key) {
            return Err(format!("Unknown question id '{}'", key));
        }
    }
    Ok(())
}

fn check_answer(question: &Question, value: &JsonValue) -> Result<(), String> {
    match question.kind {
        QuestionKind::Text => match value.as_str() {
            Some(s) if question.required && s.trim().is_empty() => Err(format!(
                "Answer for required question '{}' is empty",
                question.text
            )),
            Some(s) if s.chars().count() > MAX_TEXT_ANSWER_CHARS => {
                Err(format!("Answer for '{}' is too long", question.text))
            }
            Some(_) => Ok(()),
            None => Err(format!("Answer for '{}' must be text", question.text)),
        },
        QuestionKind::Number => {
            if value.is_number() {
                Ok(())
            } else {
                Err(format!("Answer for '{}' must be a number", question.text))
            }
        }
        QuestionKind::Choice => match value.as_str() {
            Some(s) if question.options.iter().any(|o| o == s) => Ok(()),
            _ => Err(format!(
                "Answer for '{}' must be one of the listed options",
                question.text
            )),
        },
        QuestionKind::Boolean => {
            if value.is_boolean() {
                Ok(())
            } else {
                Err(format!("Answer for '{}' must be true or false", question.text))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn questions() -> Vec<Question> {
        serde_json::from_value(json!([
            {"id": "q1", "text": "Какой у вас опыт с Rust?", "required": true},
            {"id": "q2", "text": "Ожидаемая зарплата", "kind": "number"},
            {"id": "q3", "text": "Формат работы", "kind": "choice", "required": true,
             "options": ["офис", "удаленно", "гибрид"]},
            {"id": "q4", "text": "Готовы к командировкам?", "kind": "boolean"}
        ]))
        .unwrap()
    }

    fn as_map(value: JsonValue) -> serde_json::Map<String, JsonValue> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn accepts_well_typed_answers() {
        let answers = as_map(json!({
            "q1": "Три года production-опыта",
            "q2": 2500,
            "q3": "удаленно",
            "q4": true
        }));
        assert!(validate_answers(&questions(), &answers).is_ok());
    }

    #[test]
    fn optional_questions_may_be_omitted() {
        let answers = as_map(json!({"q1": "Есть опыт", "q3": "офис"}));
        assert!(validate_answers(&questions(), &answers).is_ok());
    }

    #[test]
    fn rejects_missing_required_answer() {
        let answers = as_map(json!({"q1": "Есть опыт"}));
        let err = validate_answers(&questions(), &answers).unwrap_err();
        assert!(err.contains("Формат работы"));
    }

    #[test]
    fn rejects_choice_outside_options() {
        let answers = as_map(json!({"q1": "Есть опыт", "q3": "из дома"}));
        assert!(validate_answers(&questions(), &answers).is_err());
    }

    #[test]
    fn rejects_mistyped_and_unknown_answers() {
        let wrong_type = as_map(json!({"q1": "ok", "q2": "не число", "q3": "офис"}));
        assert!(validate_answers(&questions(), &wrong_type).is_err());

        let unknown = as_map(json!({"q1": "ok", "q3": "офис", "q99": "x"}));
        assert!(validate_answers(&questions(), &unknown).is_err());
    }
}

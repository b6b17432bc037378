//! Person-detail payload embedded in every report submission.

use serde::{Deserialize, Serialize};

use crate::CoreResult;

/// One visited person inside the `datos_usuarios` payload.
///
/// Wire keys stay Spanish for compatibility with the mobile client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonDetail {
    #[serde(rename = "nombre")]
    pub name: String,

    #[serde(rename = "atendido")]
    pub attended: bool,

    /// Work performed, as a comma-separated task list. Only meaningful when
    /// the person was attended.
    #[serde(rename = "trabajo", default)]
    pub work_done: String,

    /// Reason the person was not attended.
    #[serde(rename = "motivo", default)]
    pub reason: String,

    /// Photo references. The client declares original filenames; after
    /// reconciliation these hold absolute server paths.
    #[serde(rename = "fotos", default)]
    pub photos: Vec<String>,

    /// Signature reference, same lifecycle as `photos`. Cleared when the
    /// referenced upload is missing.
    #[serde(rename = "firma", default)]
    pub signature: Option<String>,
}

impl PersonDetail {
    /// Parse the raw `datos_usuarios` form field.
    pub fn parse_list(raw: &str) -> CoreResult<Vec<PersonDetail>> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Split `trabajo` into trimmed, non-empty task items.
    pub fn task_items(&self) -> Vec<&str> {
        self.work_done
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .collect()
    }

    /// Whether `trabajo` should render as a bulleted checklist rather than
    /// a plain paragraph.
    pub fn has_task_list(&self) -> bool {
        self.work_done.contains(',')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_payload() {
        let raw = r#"[
            {"nombre": "Ana Rojas", "atendido": true,
             "trabajo": "Windows Update, Antivirus, Limpieza",
             "fotos": ["a.jpg", "b.jpg"], "firma": "firma_ana.png"},
            {"nombre": "Luis Soto", "atendido": false,
             "motivo": "De vacaciones"}
        ]"#;

        let people = PersonDetail::parse_list(raw).unwrap();
        assert_eq!(people.len(), 2);
        assert_eq!(people[0].name, "Ana Rojas");
        assert!(people[0].attended);
        assert_eq!(people[0].photos.len(), 2);
        assert_eq!(people[0].signature.as_deref(), Some("firma_ana.png"));
        assert!(!people[1].attended);
        assert_eq!(people[1].reason, "De vacaciones");
        assert!(people[1].photos.is_empty());
        assert!(people[1].signature.is_none());
    }

    #[test]
    fn rejects_malformed_payload() {
        assert!(PersonDetail::parse_list("{not json").is_err());
    }

    #[test]
    fn splits_tasks_on_commas() {
        let person = PersonDetail {
            name: "Ana".into(),
            attended: true,
            work_done: "Windows Update,  Antivirus , ,Limpieza".into(),
            reason: String::new(),
            photos: vec![],
            signature: None,
        };
        assert!(person.has_task_list());
        assert_eq!(person.task_items(), vec!["Windows Update", "Antivirus", "Limpieza"]);
    }

    #[test]
    fn plain_text_work_is_not_a_list() {
        let person = PersonDetail {
            name: "Ana".into(),
            attended: true,
            work_done: "Revisión general del equipo".into(),
            reason: String::new(),
            photos: vec![],
            signature: None,
        };
        assert!(!person.has_task_list());
        assert_eq!(person.task_items(), vec!["Revisión general del equipo"]);
    }

    #[test]
    fn serializes_back_to_spanish_keys() {
        let person = PersonDetail {
            name: "Ana".into(),
            attended: true,
            work_done: "Revisión".into(),
            reason: String::new(),
            photos: vec!["/tmp/scratch/a.jpg".into()],
            signature: None,
        };
        let value = serde_json::to_value(&person).unwrap();
        assert_eq!(value["nombre"], "Ana");
        assert_eq!(value["atendido"], true);
        assert_eq!(value["fotos"][0], "/tmp/scratch/a.jpg");
    }
}

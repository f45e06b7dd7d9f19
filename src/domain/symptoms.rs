use crate::domain::models::CalendarDate;
use serde::{Deserialize, Serialize};

macro_rules! api_vocabulary {
    ($name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_api_value(self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }

            pub fn from_api_value(value: &str) -> Option<Self> {
                let value = value.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|candidate| candidate.as_api_value().eq_ignore_ascii_case(value))
            }
        }
    };
}

api_vocabulary!(BleedingAmount {
    Light => "ligero",
    Moderate => "moderado",
    Heavy => "abundante",
    VeryHeavy => "muy_abundante",
});

api_vocabulary!(BleedingColor {
    BrightRed => "rojo_brillante",
    DarkRed => "rojo_oscuro",
    Brown => "marron",
    Black => "negro",
});

api_vocabulary!(FlowColor {
    Transparent => "transparente",
    White => "blanco",
    Yellow => "amarillo",
    Brown => "marron",
});

api_vocabulary!(Emotion {
    Happy => "feliz",
    Sad => "triste",
    Stressed => "estresado",
    Anxious => "ansioso",
    Bored => "aburrido",
    Excited => "emocionado",
    Motivated => "motivado",
    Tired => "cansado",
    Relaxed => "relajado",
    Nostalgic => "nostalgico",
    Frustrated => "frustrado",
    Apathetic => "apatico",
});

pub const MAX_PAIN_LEVEL: u8 = 10;

/// What the user logs for a single day. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymptomEntry {
    pub bleeding_amount: Option<BleedingAmount>,
    pub bleeding_color: Option<BleedingColor>,
    pub pain_level: Option<u8>,
    pub cravings: Option<String>,
    pub flow_color: Option<FlowColor>,
    pub emotions: Vec<Emotion>,
}

impl SymptomEntry {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(level) = self.pain_level {
            if level > MAX_PAIN_LEVEL {
                return Err(format!("symptoms.pain_level must be 0..={MAX_PAIN_LEVEL}"));
            }
        }
        Ok(())
    }

    /// Adds the emotion when absent, removes it when present.
    pub fn toggle_emotion(&mut self, emotion: Emotion) {
        if let Some(position) = self.emotions.iter().position(|current| *current == emotion) {
            self.emotions.remove(position);
        } else {
            self.emotions.push(emotion);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySymptoms {
    pub id: String,
    pub user_id: String,
    pub date: CalendarDate,
    pub entry: SymptomEntry,
    pub created_at: String,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vocabulary_matches_api_values_case_insensitively() {
        assert_eq!(
            BleedingAmount::from_api_value("MUY_ABUNDANTE"),
            Some(BleedingAmount::VeryHeavy)
        );
        assert_eq!(FlowColor::from_api_value(" marron "), Some(FlowColor::Brown));
        assert_eq!(Emotion::from_api_value("desconocido"), None);
        assert_eq!(BleedingColor::DarkRed.as_api_value(), "rojo_oscuro");
    }

    #[test]
    fn pain_level_above_ten_is_rejected() {
        let entry = SymptomEntry {
            pain_level: Some(11),
            ..SymptomEntry::default()
        };
        assert!(entry.validate().is_err());
        assert!(SymptomEntry::default().validate().is_ok());
    }

    #[test]
    fn toggle_emotion_adds_then_removes() {
        let mut entry = SymptomEntry::default();
        entry.toggle_emotion(Emotion::Tired);
        entry.toggle_emotion(Emotion::Happy);
        assert_eq!(entry.emotions, vec![Emotion::Tired, Emotion::Happy]);
        entry.toggle_emotion(Emotion::Tired);
        assert_eq!(entry.emotions, vec![Emotion::Happy]);
    }
}

use serde::{Deserialize, Serialize};

/// Natural language used for descriptions and user-facing placeholder text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Lao,
    English,
}

impl Language {
    /// Language name as it appears in the prompt rules.
    pub fn name(self) -> &'static str {
        match self {
            Language::Lao => "Lao",
            Language::English => "English",
        }
    }

    /// Example value for the `description` field of the requested JSON shape.
    pub fn description_hint(self) -> &'static str {
        match self {
            Language::Lao => "ຄໍາອະທິບາຍເປັນພາສາລາວວ່າຄໍາສັ່ງ SQL ນີ້ເຮັດຫຍັງ",
            Language::English => "A short explanation in English of what this SQL query does",
        }
    }

    pub fn no_question(self) -> &'static str {
        match self {
            Language::Lao => "ບໍ່ມີຄໍາຖາມໃຫ້ສ້າງ SQL",
            Language::English => "There is no question to generate SQL from",
        }
    }

    pub fn no_schema(self) -> &'static str {
        match self {
            Language::Lao => "ບໍ່ມີຂໍ້ມູນ Schema ຖານຂໍ້ມູນ",
            Language::English => "No database schema information is available",
        }
    }

    pub fn no_description(self) -> &'static str {
        match self {
            Language::Lao => "ບໍ່ມີຄໍາອະທິບາຍ",
            Language::English => "No description provided",
        }
    }

    /// Used when fallback extraction recovered SQL but no explanatory text.
    pub fn generated_from_question(self) -> &'static str {
        match self {
            Language::Lao => "ຄໍາສັ່ງ SQL ທີ່ສ້າງຈາກຄໍາຖາມຂອງຜູ້ໃຊ້",
            Language::English => "SQL query generated from the user's question",
        }
    }

    pub fn generation_error_prefix(self) -> &'static str {
        match self {
            Language::Lao => "ຂໍ້ຜິດພາດໃນການສ້າງ SQL: ",
            Language::English => "Error while generating SQL: ",
        }
    }
}

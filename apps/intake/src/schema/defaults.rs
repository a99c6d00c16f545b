use crate::schema::models::{FieldDefinition, FieldType, Schema};

/// Name of the multipart part carrying the résumé.
pub const DOCUMENT_FIELD: &str = "cv-resume";

const PERSONAL: &str = "Personal Information";
const DETAILS: &str = "Application Details";
const DOCUMENTS: &str = "Documents";

/// Built-in form used when neither the dashboard nor the store has one.
pub fn default_schema() -> Schema {
    let field = |name: &str, label: &str, field_type: FieldType, subsection: &str, order: i64| {
        FieldDefinition {
            name: name.to_string(),
            label: Some(label.to_string()),
            field_type,
            subsection: subsection.to_string(),
            order,
            required: true,
            options: String::new(),
            validations: String::new(),
        }
    };

    Schema::from_sections(vec![
        (
            PERSONAL.to_string(),
            vec![
                field("name", "Full Name", FieldType::Text, PERSONAL, 1),
                field("email", "Email Address", FieldType::Email, PERSONAL, 2),
                field("phone", "Phone Number", FieldType::Tel, PERSONAL, 3),
            ],
        ),
        (
            DETAILS.to_string(),
            vec![
                field("position", "Position Applied For", FieldType::Text, DETAILS, 4),
                field("location", "Preferred Location", FieldType::Text, DETAILS, 5),
                field("qualification", "Highest Qualification", FieldType::Text, DETAILS, 6),
            ],
        ),
        (
            DOCUMENTS.to_string(),
            vec![field(DOCUMENT_FIELD, "CV / Resume", FieldType::File, DOCUMENTS, 7)],
        ),
    ])
}

//! Employee ("Funcionário") entity
//!
//! The wire shape keeps the Portuguese camelCase field names the existing
//! clients send and read. PascalCase names are accepted on input.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};

/// Store-assigned employee identifier
pub type EmployeeId = i32;

/// Identifier of an employee that has not been persisted yet
pub const UNASSIGNED_ID: EmployeeId = 0;

/// Employee record owned by the record store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    #[serde(default, alias = "Id")]
    pub id: EmployeeId,

    #[serde(default, rename = "nome", alias = "Nome")]
    #[sqlx(rename = "nome")]
    pub name: Option<String>,

    #[serde(default, rename = "endereco", alias = "Endereco")]
    #[sqlx(rename = "endereco")]
    pub address: Option<String>,

    #[serde(default, rename = "ramal", alias = "Ramal")]
    #[sqlx(rename = "ramal")]
    pub extension: Option<String>,

    #[serde(default, rename = "emailProfissional", alias = "EmailProfissional")]
    #[sqlx(rename = "email_profissional")]
    pub work_email: Option<String>,

    #[serde(default, rename = "departamento", alias = "Departamento")]
    #[sqlx(rename = "departamento")]
    pub department: Option<String>,

    #[serde(default, rename = "salario", alias = "Salario")]
    #[sqlx(rename = "salario")]
    pub salary: f64,

    #[serde(
        default,
        rename = "dataAdmissao",
        alias = "DataAdmissao",
        deserialize_with = "deserialize_admission_date"
    )]
    #[sqlx(rename = "data_admissao")]
    pub admission_date: Option<NaiveDateTime>,
}

impl Employee {
    /// Department as a string slice, empty when unset
    pub fn department(&self) -> &str {
        self.department.as_deref().unwrap_or_default()
    }

    /// Check the two required fields, name first
    ///
    /// Returns the client-facing message naming the missing field.
    pub fn validate(&self) -> Result<(), &'static str> {
        if is_blank(self.name.as_deref()) {
            return Err("O campo Nome é obrigatório.");
        }
        if is_blank(self.department.as_deref()) {
            return Err("O campo Departamento é obrigatório.");
        }
        Ok(())
    }

    /// Overwrite every mutable field with the values from `other`
    ///
    /// The identifier is left untouched.
    pub fn overwrite_from(&mut self, other: Employee) {
        self.name = other.name;
        self.address = other.address;
        self.extension = other.extension;
        self.work_email = other.work_email;
        self.department = other.department;
        self.salary = other.salary;
        self.admission_date = other.admission_date;
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |s| s.trim().is_empty())
}

/// Parse an admission date sent by a client
///
/// Accepts a local date-time (`2022-08-15T08:30:00`), an RFC 3339 timestamp
/// with offset (converted to UTC) or a bare date (midnight).
pub fn parse_admission_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    value
        .parse::<NaiveDateTime>()
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.naive_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

fn deserialize_admission_date<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) => parse_admission_date(&raw).map(Some).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid admission date: {}", raw))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> Employee {
        Employee {
            id: 7,
            name: Some("Ana".into()),
            address: Some("Rua A, 10".into()),
            extension: Some("2231".into()),
            work_email: Some("ana@empresa.com".into()),
            department: Some("TI".into()),
            salary: 5200.5,
            admission_date: NaiveDate::from_ymd_opt(2021, 3, 1)
                .and_then(|d| d.and_hms_opt(9, 0, 0)),
        }
    }

    #[test]
    fn test_validate_accepts_complete_employee() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_checks_name_before_department() {
        let employee = Employee::default();
        assert_eq!(employee.validate(), Err("O campo Nome é obrigatório."));

        let employee = Employee {
            name: Some("   ".into()),
            department: Some("TI".into()),
            ..Employee::default()
        };
        assert_eq!(employee.validate(), Err("O campo Nome é obrigatório."));

        let employee = Employee {
            name: Some("Ana".into()),
            department: Some("\t".into()),
            ..Employee::default()
        };
        assert_eq!(
            employee.validate(),
            Err("O campo Departamento é obrigatório.")
        );
    }

    #[test]
    fn test_overwrite_keeps_id() {
        let mut stored = sample();
        let incoming = Employee {
            id: 99,
            name: Some("Bruno".into()),
            department: Some("RH".into()),
            salary: 3100.0,
            ..Employee::default()
        };

        stored.overwrite_from(incoming);

        assert_eq!(stored.id, 7);
        assert_eq!(stored.name.as_deref(), Some("Bruno"));
        assert_eq!(stored.department(), "RH");
        assert!(stored.address.is_none());
        assert!(stored.work_email.is_none());
        assert_eq!(stored.salary, 3100.0);
        assert!(stored.admission_date.is_none());
    }

    #[test]
    fn test_admission_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2022, 8, 15).and_then(|d| d.and_hms_opt(8, 30, 0));

        assert_eq!(parse_admission_date("2022-08-15T08:30:00"), expected);
        assert_eq!(parse_admission_date("2022-08-15T08:30:00Z"), expected);
        assert_eq!(parse_admission_date("2022-08-15T05:30:00-03:00"), expected);
        assert_eq!(
            parse_admission_date("2022-08-15"),
            NaiveDate::from_ymd_opt(2022, 8, 15).and_then(|d| d.and_hms_opt(0, 0, 0))
        );
        assert!(parse_admission_date("15/08/2022").is_none());

        let parsed: Employee = serde_json::from_str(r#"{"dataAdmissao":null}"#).unwrap();
        assert!(parsed.admission_date.is_none());
        assert!(serde_json::from_str::<Employee>(r#"{"dataAdmissao":"ontem"}"#).is_err());
    }

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["nome"], "Ana");
        assert_eq!(json["emailProfissional"], "ana@empresa.com");
        assert_eq!(json["dataAdmissao"], "2021-03-01T09:00:00");

        let parsed: Employee =
            serde_json::from_str(r#"{"Nome":"Ana","Departamento":"TI"}"#).unwrap();
        assert_eq!(parsed.id, UNASSIGNED_ID);
        assert_eq!(parsed.name.as_deref(), Some("Ana"));
        assert_eq!(parsed.department(), "TI");
    }
}

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Closed set of caller roles. The role is fixed at registration; there is no
/// promotion or demotion flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Clinician,
    Admin,
}

impl Role {
    /// Resolve the role of a user, `None` if the user no longer exists.
    pub async fn of_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<Role>> {
        let role = sqlx::query_scalar::<_, Role>(r#"SELECT role FROM users WHERE id = $1"#)
            .bind(user_id)
            .fetch_optional(db)
            .await?;
        Ok(role)
    }

    pub fn is_patient(self) -> bool {
        matches!(self, Role::Patient)
    }

    pub fn is_clinician(self) -> bool {
        matches!(self, Role::Clinician)
    }

    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// What a caller may see of the prediction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Only records owned by this user.
    Own(Uuid),
    /// Every record.
    All,
    /// Nothing. Callers without a resolvable role are denied by default.
    Denied,
}

impl Visibility {
    pub fn for_caller(user_id: Uuid, role: Option<Role>) -> Self {
        match role {
            Some(Role::Patient) => Visibility::Own(user_id),
            Some(Role::Clinician) | Some(Role::Admin) => Visibility::All,
            None => Visibility::Denied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates_match_exactly_one_role() {
        assert!(Role::Patient.is_patient());
        assert!(!Role::Patient.is_clinician());
        assert!(!Role::Patient.is_admin());

        assert!(Role::Clinician.is_clinician());
        assert!(!Role::Clinician.is_admin());

        assert!(Role::Admin.is_admin());
        assert!(!Role::Admin.is_patient());
    }

    #[test]
    fn patient_sees_only_own_records() {
        let id = Uuid::new_v4();
        assert_eq!(
            Visibility::for_caller(id, Some(Role::Patient)),
            Visibility::Own(id)
        );
    }

    #[test]
    fn clinician_and_admin_see_everything() {
        let id = Uuid::new_v4();
        assert_eq!(
            Visibility::for_caller(id, Some(Role::Clinician)),
            Visibility::All
        );
        assert_eq!(
            Visibility::for_caller(id, Some(Role::Admin)),
            Visibility::All
        );
    }

    #[test]
    fn missing_role_is_default_deny() {
        assert_eq!(
            Visibility::for_caller(Uuid::new_v4(), None),
            Visibility::Denied
        );
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Patient).unwrap(), "\"patient\"");
        assert_eq!(
            serde_json::from_str::<Role>("\"clinician\"").unwrap(),
            Role::Clinician
        );
    }
}

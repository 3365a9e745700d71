//! `inetOrgPerson` entry to [`Staff`] mapping.

use staffio_core::{Gender, Staff};

use crate::connection::Entry;

/// Attributes requested when fetching a person.
pub const STAFF_ATTRIBUTES: &[&str] = &[
    "uid",
    "mail",
    "cn",
    "sn",
    "givenName",
    "employeeNumber",
    "employeeType",
    "mobile",
    "gender",
];

/// Builds a staff record from a directory entry.
#[must_use]
pub fn entry_to_staff(entry: &Entry) -> Staff {
    Staff {
        uid: entry.first("uid").to_owned(),
        dn: Some(entry.dn.clone()),
        email: entry.first("mail").to_owned(),
        common_name: entry.first("cn").to_owned(),
        surname: entry.first("sn").to_owned(),
        given_name: entry.first("givenName").to_owned(),
        employee_number: entry.first("employeeNumber").to_owned(),
        employee_type: entry.first("employeeType").to_owned(),
        mobile: entry.first("mobile").to_owned(),
        gender: Gender::from_attr(entry.first("gender")),
    }
}

/// Builds an entry carrying `staff`'s attributes. Empty fields are omitted.
#[must_use]
pub fn staff_to_entry(staff: &Staff, dn: impl Into<String>) -> Entry {
    let pairs = [
        ("uid", staff.uid.as_str()),
        ("mail", staff.email.as_str()),
        ("cn", staff.common_name.as_str()),
        ("sn", staff.surname.as_str()),
        ("givenName", staff.given_name.as_str()),
        ("employeeNumber", staff.employee_number.as_str()),
        ("employeeType", staff.employee_type.as_str()),
        ("mobile", staff.mobile.as_str()),
        ("gender", staff.gender.as_str()),
    ];

    Entry {
        dn: dn.into(),
        attrs: pairs
            .into_iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(name, value)| (name.to_owned(), vec![value.to_owned()]))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_round_trip() {
        let staff = Staff {
            uid: "bob".into(),
            email: "bob@example.org".into(),
            common_name: "Bob Stone".into(),
            surname: "Stone".into(),
            given_name: "Bob".into(),
            mobile: "13800000000".into(),
            gender: Gender::Male,
            ..Default::default()
        };

        let entry = staff_to_entry(&staff, "uid=bob,ou=people,dc=example,dc=org");
        assert!(!entry.attrs.contains_key("employeeNumber"));
        assert_eq!(entry.first("gender"), "m");

        let back = entry_to_staff(&entry);
        assert_eq!(back.dn.as_deref(), Some("uid=bob,ou=people,dc=example,dc=org"));
        assert_eq!(Staff { dn: None, ..back }, staff);
    }

    #[test]
    fn test_missing_attributes_are_empty() {
        let entry = Entry {
            dn: "uid=x,dc=example,dc=org".into(),
            ..Default::default()
        };
        let staff = entry_to_staff(&entry);
        assert_eq!(staff.uid, "");
        assert_eq!(staff.gender, Gender::Unknown);
    }
}

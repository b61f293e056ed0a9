#![allow(dead_code)]

use criteria::{CriteriaBuilder, EntityType, Schema};

/// Document model shared by the integration tests.
pub fn schema() -> Schema {
    Schema::new()
        .register(
            EntityType::new("Document", "id")
                .basic("name")
                .basic("age")
                .basic("idx")
                .basic("creationDate")
                .to_one("owner", "Person")
                .to_one_nullable("partnerDocument", "Document")
                .map_of("contacts", "Person")
                .map_of("people", "Person")
                .set_of("partners", "Person")
                .list_of("versions", "Version"),
        )
        .register(
            EntityType::new("Person", "id")
                .basic("name")
                .basic("age")
                .basic_unique("email")
                .map_of_basic("localized")
                .to_one_nullable("partnerDocument", "Document"),
        )
        .register(EntityType::new("Version", "id").basic("date").basic("idx"))
}

pub fn document(alias: &str) -> CriteriaBuilder {
    CriteriaBuilder::new(schema(), "Document", alias).unwrap()
}

/// Error of a fallible builder step whose success type has no `Debug` impl.
pub fn expect_err<T>(result: Result<T, criteria::CriteriaError>) -> criteria::CriteriaError {
    match result {
        Ok(_) => panic!("expected the builder step to fail"),
        Err(err) => err,
    }
}

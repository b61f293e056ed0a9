use criteria::{CriteriaError, Value};

mod common;

#[test]
fn offset_split_prunes_joins_per_query() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .select("d.contacts[:contactNr].name")?
        .where_("d.owner.name")?
        .eq("Karl")?
        .order_by_asc("d.id")?;
    let page = cb.page(0, 10)?;

    assert_eq!(page.first_result(), Some(0));
    assert_eq!(page.max_results(), 10);

    // the select-only contacts join is dropped from count and id query
    assert_eq!(
        page.count_query_string()?,
        "SELECT COUNT(DISTINCT d.id) FROM Document d JOIN d.owner owner_1 \
         WHERE owner_1.name = :param_0"
    );
    assert_eq!(
        page.id_query_string()?,
        "SELECT d.id FROM Document d JOIN d.owner owner_1 \
         WHERE owner_1.name = :param_0 GROUP BY d.id ORDER BY d.id ASC NULLS LAST"
    );
    // the where-only owner join is dropped from the content query
    assert_eq!(
        page.query_string()?,
        "SELECT contacts_contactNr_1.name FROM Document d \
         LEFT JOIN d.contacts contacts_contactNr_1 \
         ON KEY(contacts_contactNr_1) = :contactNr \
         WHERE d.id IN (:ids) ORDER BY d.id ASC NULLS LAST"
    );

    let ids = page
        .parameters()
        .into_iter()
        .find(|p| p.name == "ids")
        .unwrap();
    assert!(ids.is_pending());
    Ok(())
}

#[test]
fn id_query_selects_and_groups_the_order_keys() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .order_by_asc("d.name")?
        .order_by_asc("d.id")?;
    let page = cb.page(0, 5)?;

    assert_eq!(
        page.count_query_string()?,
        "SELECT COUNT(DISTINCT d.id) FROM Document d"
    );
    assert_eq!(
        page.id_query_string()?,
        "SELECT d.id, d.name FROM Document d GROUP BY d.id, d.name \
         ORDER BY d.name ASC NULLS LAST, d.id ASC NULLS LAST"
    );
    assert_eq!(
        page.query_string()?,
        "SELECT d FROM Document d WHERE d.id IN (:ids) \
         ORDER BY d.name ASC NULLS LAST, d.id ASC NULLS LAST"
    );
    Ok(())
}

#[test]
fn position_request_embeds_page_position_in_the_count() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .order_by_asc("d.name")?
        .order_by_asc("d.id")?;
    let page = cb.page_at(4, 10)?;

    assert_eq!(page.first_result(), None);
    assert_eq!(
        page.count_query_string()?,
        "SELECT COUNT(DISTINCT d.id), PAGE_POSITION((SELECT _page_position_d.id, \
         _page_position_d.name FROM Document _page_position_d \
         GROUP BY _page_position_d.id, _page_position_d.name \
         ORDER BY _page_position_d.name ASC NULLS LAST, \
         _page_position_d.id ASC NULLS LAST), :_entityPagePositionParameter) \
         FROM Document d"
    );

    let reference = page
        .parameters()
        .into_iter()
        .find(|p| p.name == "_entityPagePositionParameter")
        .unwrap();
    assert_eq!(reference.value, Some(Value::Int(4)));
    Ok(())
}

#[test]
fn keyset_paging_after_an_anchor_row() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .order_by_asc("d.name")?
        .order_by_asc("d.id")?;
    let page = cb.page_after(vec![Value::Text("b".into()), Value::Int(5)], 10)?;

    assert_eq!(
        page.id_query_string()?,
        "SELECT d.id, d.name FROM Document d \
         WHERE d.name > :keyset_0 OR (d.name = :keyset_0 AND d.id > :keyset_1) \
         GROUP BY d.id, d.name ORDER BY d.name ASC NULLS LAST, d.id ASC NULLS LAST"
    );
    assert_eq!(
        page.parameters()
            .into_iter()
            .find(|p| p.name == "keyset_1")
            .unwrap()
            .value,
        Some(Value::Int(5))
    );
    Ok(())
}

#[test]
fn backward_keyset_paging_inverts_comparison_and_order() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .order_by_asc("d.name")?
        .order_by_asc("d.id")?;
    let page = cb.page_before(vec![Value::Text("b".into()), Value::Int(5)], 10)?;

    assert_eq!(
        page.id_query_string()?,
        "SELECT d.id, d.name FROM Document d \
         WHERE d.name < :keyset_0 OR (d.name = :keyset_0 AND d.id < :keyset_1) \
         GROUP BY d.id, d.name ORDER BY d.name DESC NULLS FIRST, d.id DESC NULLS FIRST"
    );
    Ok(())
}

#[test]
fn keyset_restriction_is_anded_to_the_base_where() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .where_("d.age")?
        .gt(20)?
        .order_by_asc("d.id")?;
    let page = cb.page_after(vec![Value::Int(7)], 10)?;

    assert_eq!(
        page.id_query_string()?,
        "SELECT d.id FROM Document d WHERE d.age > :param_0 AND d.id > :keyset_0 \
         GROUP BY d.id ORDER BY d.id ASC NULLS LAST"
    );
    Ok(())
}

#[test]
fn a_unique_join_attribute_may_close_the_ordering() -> Result<(), CriteriaError> {
    let cb = common::document("d").order_by_asc("d.owner.email")?;
    let page = cb.page(0, 10)?;

    assert_eq!(
        page.id_query_string()?,
        "SELECT d.id, owner_1.email FROM Document d JOIN d.owner owner_1 \
         GROUP BY d.id, owner_1.email ORDER BY owner_1.email ASC NULLS LAST"
    );
    Ok(())
}

#[test]
fn pagination_requires_an_order_by() {
    let err = common::expect_err(common::document("d").page(0, 10));
    assert!(matches!(err, CriteriaError::PaginationState(_)));
}

#[test]
fn pagination_rejects_a_non_unique_last_order_key() {
    let cb = common::document("d").order_by_asc("d.name").unwrap();
    let err = common::expect_err(cb.page(0, 10));
    assert!(matches!(err, CriteriaError::PaginationState(_)));
}

#[test]
fn pagination_rejects_group_by() {
    let cb = common::document("d")
        .group_by("d.age")
        .unwrap()
        .order_by_asc("d.id")
        .unwrap();
    let err = common::expect_err(cb.page(0, 10));
    assert!(matches!(err, CriteriaError::PaginationState(_)));
}

#[test]
fn distinct_pagination_needs_the_sole_root_id_projection() {
    let cb = common::document("d")
        .select("d.name")
        .unwrap()
        .distinct()
        .unwrap()
        .order_by_asc("d.id")
        .unwrap();
    let err = common::expect_err(cb.page(0, 10));
    assert!(matches!(err, CriteriaError::PaginationState(_)));

    let cb = common::document("d")
        .select("d.id")
        .unwrap()
        .distinct()
        .unwrap()
        .order_by_asc("d.id")
        .unwrap();
    assert!(cb.page(0, 10).is_ok());
}

#[test]
fn keyset_anchor_must_match_the_order_key_count() {
    let cb = common::document("d")
        .order_by_asc("d.name")
        .unwrap()
        .order_by_asc("d.id")
        .unwrap();
    let err = common::expect_err(cb.page_after(vec![Value::Int(1)], 10));
    assert!(matches!(err, CriteriaError::PaginationState(_)));
}

#[test]
fn index_source_joins_survive_a_later_restriction() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .select("d.versions[d.owner.age].date")?
        .order_by_asc("d.id")?;
    let page = cb.page(0, 10)?;

    // the owner join only feeds the index restriction, but must stay with it
    let expected = "SELECT versions_owner_1_age_1.date FROM Document d \
         JOIN d.owner owner_1 \
         LEFT JOIN d.versions versions_owner_1_age_1 \
         ON INDEX(versions_owner_1_age_1) = owner_1.age \
         WHERE d.id IN (:ids) ORDER BY d.id ASC NULLS LAST";
    assert_eq!(page.query_string()?, expected);

    // a restriction added afterwards re-resolves the query; the index's
    // joins must be re-marked even though the select path is already resolved
    let _cb = cb.where_("d.name")?.eq("x")?;
    assert_eq!(page.query_string()?, expected);
    Ok(())
}

#[test]
fn structural_changes_after_pagination_fail() -> Result<(), CriteriaError> {
    let cb = common::document("d").order_by_asc("d.id")?;
    let _page = cb.page(0, 10)?;

    let err = common::expect_err(cb.clone().distinct());
    assert!(matches!(err, CriteriaError::PaginationState(_)));
    let err = common::expect_err(cb.group_by("d.age"));
    assert!(matches!(err, CriteriaError::PaginationState(_)));
    Ok(())
}

use criteria::CriteriaError;

mod common;

#[test]
fn rendering_while_a_restriction_is_open_fails() -> Result<(), CriteriaError> {
    let cb = common::document("d");
    let open = cb.clone().where_("d.age")?;

    let err = cb.query_string().unwrap_err();
    assert!(matches!(err, CriteriaError::Chaining(_)));

    // closing the restriction settles the chain again
    open.gt(1)?;
    assert_eq!(
        cb.query_string()?,
        "SELECT d FROM Document d WHERE d.age > :param_0"
    );
    Ok(())
}

#[test]
fn starting_a_sibling_builder_while_one_is_open_fails() -> Result<(), CriteriaError> {
    let cb = common::document("d");
    let _open = cb.clone().where_("d.age")?;

    let err = common::expect_err(cb.clone().where_("d.name"));
    assert!(matches!(err, CriteriaError::Chaining(_)));
    let err = common::expect_err(cb.clone().select("d.name"));
    assert!(matches!(err, CriteriaError::Chaining(_)));
    let err = common::expect_err(cb.page(0, 10));
    assert!(matches!(err, CriteriaError::Chaining(_)));
    Ok(())
}

#[test]
fn pagination_views_refuse_to_render_over_an_open_builder() -> Result<(), CriteriaError> {
    let cb = common::document("d").order_by_asc("d.id")?;
    let page = cb.page(0, 10)?;

    let _open = cb.clone().where_("d.age")?;
    let err = page.count_query_string().unwrap_err();
    assert!(matches!(err, CriteriaError::Chaining(_)));
    Ok(())
}

#[test]
fn a_subquery_needs_a_from_entity() -> Result<(), CriteriaError> {
    let err = common::expect_err(common::document("d").where_exists()?.end());
    assert!(matches!(err, CriteriaError::Chaining(_)));
    Ok(())
}

#[test]
fn a_subquery_rejects_an_unknown_entity() -> Result<(), CriteriaError> {
    let err = common::expect_err(common::document("d").where_exists()?.from("Widget", "w"));
    assert!(matches!(err, CriteriaError::Resolution(_)));
    Ok(())
}

#[test]
fn malformed_expression_text_fails_at_the_call_site() {
    let err = common::expect_err(common::document("d").select("d..name"));
    assert!(matches!(err, CriteriaError::Parse { .. }));
}

#[test]
fn parse_errors_carry_a_position() {
    let err = common::expect_err(common::document("d").select("d.name +"));
    let CriteriaError::Parse { position, .. } = err else {
        panic!("expected a parse error");
    };
    assert!(position > 0);
}

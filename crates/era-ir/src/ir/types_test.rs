use super::*;

#[test]
fn test_parse_basic_kinds() {
    assert_eq!(parse_kind("int"), Some(TyKind::Int));
    assert_eq!(parse_kind("INTEGER"), Some(TyKind::Int));
    assert_eq!(parse_kind("bigint"), Some(TyKind::Int));
    assert_eq!(parse_kind("double"), Some(TyKind::Float));
    assert_eq!(parse_kind("Double Precision"), Some(TyKind::Float));
    assert_eq!(parse_kind("varchar"), Some(TyKind::String));
    assert_eq!(parse_kind("text"), Some(TyKind::String));
    assert_eq!(parse_kind("bool"), Some(TyKind::Boolean));
    assert_eq!(parse_kind("timestamp"), Some(TyKind::Timestamp));
    assert_eq!(parse_kind("date"), Some(TyKind::Date));
    assert_eq!(parse_kind("somecustomtype"), None);
}

#[test]
fn test_parse_ty_nullability() {
    assert_eq!(parse_ty("int"), Some(Ty::nullable(TyKind::Int)));
    assert_eq!(parse_ty("int NOT NULL"), Some(Ty::nn(TyKind::Int)));
    assert_eq!(parse_ty("  string not null "), Some(Ty::nn(TyKind::String)));
    assert_eq!(parse_ty("NOT NULL"), None);
    assert_eq!(parse_ty("intNOT NULL"), None);
}

#[test]
fn test_ty_display() {
    assert_eq!(Ty::nn(TyKind::Int).to_string(), "int NOT NULL");
    assert_eq!(Ty::nullable(TyKind::String).to_string(), "string");
    assert_eq!(Ty::nn(TyKind::Boolean).to_string(), "boolean NOT NULL");
}

#[test]
fn test_ty_display_parses_back() {
    for kind in [
        TyKind::Int,
        TyKind::Float,
        TyKind::String,
        TyKind::Boolean,
        TyKind::Timestamp,
        TyKind::Date,
    ] {
        for ty in [Ty::nn(kind), Ty::nullable(kind)] {
            assert_eq!(parse_ty(&ty.to_string()), Some(ty));
        }
    }
}

#[test]
fn test_kind_compatibility() {
    assert!(TyKind::Int.is_comparable_with(&TyKind::Float));
    assert!(TyKind::Date.is_comparable_with(&TyKind::Timestamp));
    assert!(!TyKind::Int.is_comparable_with(&TyKind::String));
    assert!(!TyKind::Boolean.is_comparable_with(&TyKind::Int));

    assert_eq!(TyKind::Int.unify(&TyKind::Int), Some(TyKind::Int));
    assert_eq!(TyKind::Int.unify(&TyKind::Float), Some(TyKind::Float));
    assert_eq!(TyKind::String.unify(&TyKind::Int), None);
}

#[test]
fn test_nullability_combine() {
    assert_eq!(
        Nullability::NotNull.combine(Nullability::NotNull),
        Nullability::NotNull
    );
    assert_eq!(
        Nullability::NotNull.combine(Nullability::Nullable),
        Nullability::Nullable
    );
    assert_eq!(
        Nullability::Nullable.combine(Nullability::NotNull),
        Nullability::Nullable
    );
}

#[test]
fn test_attribute_set_listing() {
    let attrs: AttributeSet = [
        ("id", Ty::nn(TyKind::Int)),
        ("state", Ty::nullable(TyKind::String)),
        ("quantity", Ty::nn(TyKind::Int)),
    ]
    .into_iter()
    .collect();

    assert_eq!(
        attrs.to_string(),
        "(\n  \"id\" int NOT NULL,\n  \"state\" string,\n  \"quantity\" int NOT NULL\n)"
    );
}

#[test]
fn test_attribute_set_lookup() {
    let attrs = AttributeSet::new(vec![
        Attribute::new("a", Ty::nn(TyKind::Int)),
        Attribute::new("b", Ty::nullable(TyKind::Date)),
    ]);
    assert_eq!(attrs.get("a"), Some(Ty::nn(TyKind::Int)));
    assert!(attrs.get("A").is_none());
    assert_eq!(attrs.names(), vec!["a", "b"]);

    let nullable = attrs.with_nullability(Nullability::Nullable);
    assert!(nullable.iter().all(|(_, ty)| ty.is_nullable()));
    assert_eq!(attrs.get("a"), Some(Ty::nn(TyKind::Int)));
}

#[test]
fn test_attribute_set_serde_keeps_order() {
    let yaml = "zeta: int NOT NULL\nalpha: string\n";
    let attrs: AttributeSet = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(attrs.names(), vec!["zeta", "alpha"]);
    assert_eq!(attrs.get("zeta"), Some(Ty::nn(TyKind::Int)));

    let json = serde_json::to_string(&attrs).unwrap();
    assert_eq!(json, r#"{"zeta":"int NOT NULL","alpha":"string"}"#);
}

#[test]
fn test_unknown_type_rejected_by_serde() {
    let result: Result<AttributeSet, _> = serde_yaml::from_str("a: blob\n");
    assert!(result.is_err());
}

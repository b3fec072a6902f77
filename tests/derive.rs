//! Derived enum and UDT codecs against live schemas.

use pretty_assertions::assert_eq;
use qail_cql::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, CqlEnum)]
#[cql(rename_all = "snake_case")]
enum Status {
    Active,
    OnHold,
    #[cql(rename = "gone")]
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, CqlEnum)]
#[cql(name = "priority", ordinal)]
enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, CqlUdt)]
#[cql(rename_all = "camelCase")]
struct ShippingAddress {
    street_name: String,
    #[cql(rename = "zip")]
    postal_code: i32,
    tags: Vec<String>,
    note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, CqlUdt)]
struct Customer {
    name: String,
    status: Status,
    home: ShippingAddress,
    previous: Vec<ShippingAddress>,
}

fn address() -> ShippingAddress {
    ShippingAddress {
        street_name: "Main St".to_string(),
        postal_code: 12345,
        tags: vec!["front".to_string(), "door".to_string()],
        note: Some("ring twice".to_string()),
    }
}

fn field(name: &str, ty: &str) -> FieldDescriptor {
    FieldDescriptor::new(name, WireType::parse_builtin(ty).unwrap())
}

#[test]
fn test_derived_names() {
    assert_eq!(<Status as qail_cql::codec::CqlEnum>::TYPE_NAME, "Status");
    assert_eq!(
        <Status as qail_cql::codec::CqlEnum>::NAMES,
        &["active", "on_hold", "gone"]
    );
    assert_eq!(ShippingAddress::TYPE_NAME, "shipping_address");
    assert_eq!(
        ShippingAddress::FIELD_NAMES,
        &["streetName", "zip", "tags", "note"]
    );
    assert_eq!(ShippingAddress::field_nullability(), vec![false, false, false, true]);
    assert_eq!(ShippingAddress::declared_type().name, "shipping_address");
}

#[test]
fn test_nominal_enum() -> anyhow::Result<()> {
    let codec = Status::codec();
    assert_eq!(codec.wire_type(), WireType::Text);
    assert_eq!(codec.encode(&Status::OnHold)?, Some(b"on_hold".to_vec()));
    assert_eq!(codec.decode(Some(&b"gone"[..]))?, Status::Deleted);
    assert_eq!(codec.format(&Status::Active), "'active'");
    assert_eq!(codec.parse("'on_hold'")?, Status::OnHold);

    match codec.decode(Some(&b"Deleted"[..])) {
        Err(CqlError::NoSuchVariant { enum_name, value }) => {
            assert_eq!(enum_name, "Status");
            assert!(value.contains("Deleted"));
        }
        other => panic!("expected NoSuchVariant, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_ordinal_enum() -> anyhow::Result<()> {
    let codec = Priority::codec();
    assert_eq!(codec.wire_type(), WireType::Int);
    assert_eq!(codec.encode(&Priority::High)?, Some(vec![0, 0, 0, 2]));
    assert_eq!(codec.decode(Some(&[0, 0, 0, 1][..]))?, Priority::Medium);
    assert_eq!(codec.format(&Priority::Low), "0");

    assert!(matches!(
        codec.decode(Some(&[0, 0, 0, 3][..])),
        Err(CqlError::NoSuchVariant { enum_name: "priority", .. })
    ));
    assert!(matches!(
        codec.decode(Some(&[0xFF, 0xFF, 0xFF, 0xFF][..])),
        Err(CqlError::NoSuchVariant { .. })
    ));
    Ok(())
}

#[test]
fn test_reordered_schema_matches_identical_bytes() -> anyhow::Result<()> {
    let declared = UdtType::new(
        "shipping_address",
        vec![
            field("streetName", "text"),
            field("zip", "int"),
            field("tags", "list<text>"),
            field("note", "text"),
        ],
    );
    let permuted = UdtType::new(
        "shipping_address",
        vec![
            field("note", "text"),
            field("zip", "int"),
            field("streetName", "text"),
            field("tags", "list<text>"),
        ],
    );

    let identical = UdtCodec::<ShippingAddress>::new(declared)?;
    let reordered = UdtCodec::<ShippingAddress>::new(permuted.clone())?;
    assert!(identical.is_identical_order());
    assert!(!reordered.is_identical_order());

    // A hand-built identical-order codec over the permuted schema must agree
    // with the permutation byte for byte.
    #[derive(Debug, PartialEq, CqlUdt)]
    #[cql(name = "shipping_address")]
    struct InSchemaOrder {
        note: Option<String>,
        zip: i32,
        #[cql(rename = "streetName")]
        street: String,
        tags: Vec<String>,
    }
    let value = address();
    let same_order = InSchemaOrder {
        note: value.note.clone(),
        zip: value.postal_code,
        street: value.street_name.clone(),
        tags: value.tags.clone(),
    };
    let schema_codec = IdenticalOrderCodec::<InSchemaOrder>::new(permuted)?;

    let bytes = reordered.encode(&value)?;
    assert_eq!(bytes, schema_codec.encode(&same_order)?);
    assert_eq!(reordered.decode(bytes.as_deref())?, value);
    assert_eq!(schema_codec.decode(bytes.as_deref())?, same_order);
    Ok(())
}

#[test]
fn test_identical_order_codec_rejects_permutation() {
    let permuted = UdtType::new(
        "shipping_address",
        vec![
            field("zip", "int"),
            field("streetName", "text"),
            field("tags", "list<text>"),
            field("note", "text"),
        ],
    );
    assert!(matches!(
        IdenticalOrderCodec::<ShippingAddress>::new(permuted.clone()),
        Err(CqlError::SchemaMismatch { .. })
    ));
    assert!(ReorderedCodec::<ShippingAddress>::new(permuted).is_ok());
}

#[test]
fn test_unpermuted_schema_same_bytes_through_both_paths() -> anyhow::Result<()> {
    let declared = ShippingAddress::declared_type();
    let identical = IdenticalOrderCodec::<ShippingAddress>::new(declared.clone())?;
    let reordered = ReorderedCodec::<ShippingAddress>::new(declared)?;

    let value = address();
    assert_eq!(identical.encode(&value)?, reordered.encode(&value)?);
    assert_eq!(identical.format(&value), reordered.format(&value));
    Ok(())
}

#[test]
fn test_nested_udts_follow_live_order() -> anyhow::Result<()> {
    // shipping_address is permuted and lacks the optional note.
    let schema = KeyspaceSchema::from_json(
        r#"{
            "keyspace": "shop",
            "types": [
                { "name": "shipping_address", "fields": [
                    { "name": "tags", "type": "list<text>" },
                    { "name": "zip", "type": "int" },
                    { "name": "streetName", "type": "text" } ] },
                { "name": "customer", "fields": [
                    { "name": "home", "type": "frozen<shipping_address>" },
                    { "name": "name", "type": "text" },
                    { "name": "previous", "type": "list<frozen<shipping_address>>" },
                    { "name": "status", "type": "text" } ] }
            ]
        }"#,
    )?;

    let codec = UdtCodec::<Customer>::new(schema.udt("customer").unwrap().clone())?;
    assert!(!codec.is_identical_order());
    let customer = Customer {
        name: "Ada".to_string(),
        status: Status::OnHold,
        home: ShippingAddress {
            note: None,
            ..address()
        },
        previous: vec![ShippingAddress {
            postal_code: 54321,
            note: None,
            ..address()
        }],
    };
    let bytes = codec.encode(&customer)?.unwrap_or_default();
    assert_eq!(codec.decode(Some(&bytes[..]))?, customer);

    // The first outer field is home, framed, in the nested live order.
    let address_codec =
        UdtCodec::<ShippingAddress>::new(schema.udt("shipping_address").unwrap().clone())?;
    let home = address_codec.encode(&customer.home)?.unwrap_or_default();
    assert_eq!(&bytes[4..4 + home.len()], &home[..]);

    let literal = codec.format(&customer);
    assert!(literal.starts_with("{home:{tags:{'front','door'},zip:12345,streetName:'Main St'}"));
    assert_eq!(codec.parse(&literal)?, customer);

    // A nested note, when present, is not written because the live type lacks it.
    let noted = Customer {
        home: address(),
        ..customer.clone()
    };
    assert_eq!(codec.decode(codec.encode(&noted)?.as_deref())?, customer);
    Ok(())
}

#[test]
fn test_nested_udt_with_unknown_field_is_schema_mismatch() -> anyhow::Result<()> {
    let schema = KeyspaceSchema::from_json(
        r#"{
            "keyspace": "shop",
            "types": [
                { "name": "shipping_address", "fields": [
                    { "name": "zip", "type": "int" },
                    { "name": "streetName", "type": "text" },
                    { "name": "tags", "type": "list<text>" },
                    { "name": "country", "type": "text" } ] },
                { "name": "customer", "fields": [
                    { "name": "name", "type": "text" },
                    { "name": "status", "type": "text" },
                    { "name": "home", "type": "frozen<shipping_address>" },
                    { "name": "previous", "type": "list<frozen<shipping_address>>" } ] }
            ]
        }"#,
    )?;
    match UdtCodec::<Customer>::new(schema.udt("customer").unwrap().clone()) {
        Err(CqlError::SchemaMismatch { type_name, reason }) => {
            assert_eq!(type_name, "shop.customer");
            assert!(reason.contains("'home'"));
            assert!(reason.contains("country"));
        }
        other => panic!("expected SchemaMismatch, got {:?}", other.map(|c| c.schema().clone())),
    }
    Ok(())
}

#[test]
fn test_missing_required_field_is_schema_mismatch() {
    let schema = UdtType::new(
        "shipping_address",
        vec![field("streetName", "text"), field("tags", "list<text>")],
    );
    let err = UdtCodec::<ShippingAddress>::new(schema).err();
    assert!(matches!(
        err,
        Some(CqlError::SchemaMismatch { ref reason, .. }) if reason.contains("zip")
    ));
}

#[test]
fn test_registry_resolves_derived_types() -> anyhow::Result<()> {
    let mut registry = CodecRegistry::with_defaults();
    registry.register(Status::codec());
    registry.register_nullable(Priority::codec());

    let status = registry.resolve::<Status>(&WireType::Text)?;
    assert_eq!(status.encode(&Status::Active)?, Some(b"active".to_vec()));

    let priority = registry.resolve::<Option<Priority>>(&WireType::Int)?;
    assert_eq!(priority.encode(&None)?, None);

    // Plain text still resolves to the built-in codec.
    let text = registry.resolve::<String>(&WireType::Text)?;
    assert_eq!(text.encode(&"active".to_string())?, Some(b"active".to_vec()));
    Ok(())
}

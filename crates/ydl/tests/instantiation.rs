//! Instantiation of resolved entries into host types
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use ydl::binder::{ClassBinder, ClassId, ClassRegistry, ConstructionError, Object};
use ydl::config::BinderConfig;
use ydl::tree::Tree;
use ydl::value::Value;
use ydl::ydl_documents;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct Address {
    street: String,
    city: String,
    state: String,
}

#[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
struct Lawyer {
    name: String,
    address: Address,
    admitted: NaiveDate,
}

#[derive(Debug, PartialEq, serde::Serialize)]
struct Person {
    first: String,
    last: String,
}

fn person_from_hash(args: &Value) -> Result<Person, &'static str> {
    let name = args
        .get("name")
        .and_then(Value::as_str)
        .ok_or("a person needs a name")?;
    let (first, last) = name.split_once(' ').unwrap_or((name, ""));
    Ok(Person {
        first: first.to_string(),
        last: last.to_string(),
    })
}

fn registry(config: &BinderConfig) -> ClassRegistry {
    let mut registry = ClassRegistry::from_config(config);
    registry
        .register::<Address>("Address")
        .register::<Lawyer>("Lawyer")
        .register_with("Person", "from_hash", person_from_hash);
    registry
}

fn config() -> BinderConfig {
    BinderConfig::from_yaml(
        r#"
class_map:
  addresses: Address
  lawyers: Lawyer
  persons: Person
class_init:
  Person: from_hash
"#,
    )
    .unwrap()
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("YDL_LOG"))
        .with_writer(std::io::stderr)
        .try_init();
}

fn entry<'v>(value: &'v Value, path: &[&str]) -> &'v Value {
    path.iter()
        .try_fold(value, |value, key| value.get(key))
        .unwrap_or_else(|| panic!("no entry at {path:?}"))
}

#[test]
fn entries_become_host_objects() {
    init_logging();

    let documents = ydl_documents! {
        "addresses" => "office: { street: 100 Main St, city: Topeka, state: KS }",
        "lawyers" => "ded: { name: Ded Doherty, address: 'ydl:/addresses/office', admitted: 1999-06-01 }",
        "persons" => "bob: { name: Bob Erickson }",
        "cases" => "erickson: { client: 'ydl:/persons/bob', counsel: 'ydl:/lawyers/ded' }",
    };

    let config = config();
    let value = Tree::load(documents.merged(), &registry(&config), config.syntax()).unwrap();

    let office = Address {
        street: "100 Main St".into(),
        city: "Topeka".into(),
        state: "KS".into(),
    };
    assert_eq!(
        entry(&value, &["addresses", "office"]).downcast_ref::<Address>(),
        Some(&office)
    );
    assert_eq!(
        entry(&value, &["lawyers", "ded"]).downcast_ref::<Lawyer>(),
        Some(&Lawyer {
            name: "Ded Doherty".into(),
            address: office,
            admitted: NaiveDate::from_ymd_opt(1999, 6, 1).unwrap(),
        })
    );
    assert_eq!(
        entry(&value, &["persons", "bob"]).downcast_ref::<Person>(),
        Some(&Person {
            first: "Bob".into(),
            last: "Erickson".into(),
        })
    );

    // copies below a container without a class stay plain data
    let client = entry(&value, &["cases", "erickson", "client"]);
    assert!(client.as_instance().is_none());
    assert_eq!(client, &"{ name: Bob Erickson }".parse::<Value>().unwrap());
}

#[test]
fn objects_serialize_as_their_representation() {
    init_logging();

    let documents = ydl_documents! {
        "persons" => "bob: { name: Bob Erickson }",
    };

    let config = config();
    let value = Tree::load(documents.merged(), &registry(&config), config.syntax()).unwrap();

    insta::assert_snapshot!(serde_yaml::to_string(&value).unwrap(), @r###"
    persons:
      bob:
        first: Bob
        last: Erickson
    "###);
}

#[test]
fn failed_construction_keeps_the_plain_value() {
    init_logging();

    let documents = ydl_documents! {
        "persons" => "bob: { name: Bob Erickson }\ncarol: { nickname: C }",
        "lawyers" => "ded: { name: Ded Doherty }",
    };

    let config = config();
    let value = Tree::load(documents.merged(), &registry(&config), config.syntax()).unwrap();

    assert!(entry(&value, &["persons", "bob"]).downcast_ref::<Person>().is_some());
    assert_eq!(
        entry(&value, &["persons", "carol"]),
        &"{ nickname: C }".parse::<Value>().unwrap()
    );
    assert_eq!(
        entry(&value, &["lawyers", "ded"]),
        &"{ name: Ded Doherty }".parse::<Value>().unwrap()
    );
}

#[test]
fn scheme_from_config() {
    init_logging();

    let config = BinderConfig::from_yaml("scheme: ref").unwrap();
    let documents = ydl_documents!("a: { x: 1 }\nb: 'ref:/a/x'\nc: 'ydl:/a/x'");

    let value = Tree::load(documents.merged(), &registry(&config), config.syntax()).unwrap();
    assert_eq!(entry(&value, &["b"]), &Value::Integer(1));
    assert_eq!(entry(&value, &["c"]).as_str(), Some("ydl:/a/x"));
}

/// Binder deciding classes by itself instead of looking them up in a table
struct Shouting;

impl ClassBinder for Shouting {
    fn class_for(&self, key: &str) -> Option<ClassId> {
        key.ends_with("_loud").then(|| ClassId::from("Shout"))
    }

    fn construct(
        &self,
        class: &ClassId,
        constructor: &ydl::binder::ConstructorId,
        args: &Value,
    ) -> Result<Object, ConstructionError> {
        assert_eq!(constructor.as_str(), "new");
        let text = args.as_str().ok_or_else(|| ConstructionError::Rejected {
            class: class.clone(),
            reason: format!("expected text, got {}", args.kind()),
        })?;
        Object::new(class.clone(), text.to_uppercase())
    }
}

#[test]
fn custom_binder() {
    init_logging();

    let documents = ydl_documents!(
        "greetings: { hello: hello }\nnames_loud: ['ydl:/greetings/hello', [nested]]\nnames: [quiet]"
    );

    let value = Tree::load(documents.merged(), &Shouting, Default::default()).unwrap();

    let loud = entry(&value, &["names_loud"]).as_sequence().unwrap();
    assert_eq!(loud[0].downcast_ref::<String>().map(String::as_str), Some("HELLO"));
    assert!(loud[1].as_instance().is_none(), "sequences are no text");
    assert_eq!(entry(&value, &["names"]), &"[quiet]".parse::<Value>().unwrap());
}

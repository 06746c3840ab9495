use heroku_config::parse::{ConfigMap, ParseOptions, ParseWarning, parse, serialize};
use proptest::prelude::*;

fn config_map() -> impl Strategy<Value = ConfigMap> {
  prop::collection::btree_map("[A-Za-z_][A-Za-z0-9_]{0,12}", "[^\"\n\r\\\\]{0,24}", 0..12)
}

proptest! {
  #[test]
  fn roundtrip_preserves_vars(vars in config_map()) {
    let parsed = parse(&serialize(&vars), ParseOptions::default());

    prop_assert_eq!(parsed.vars, vars);
    prop_assert!(parsed.warnings.is_empty());
  }

  #[test]
  fn serialize_ignores_insertion_order(vars in config_map()) {
    let reversed: ConfigMap = vars
      .iter()
      .rev()
      .map(|(k, v)| (k.clone(), v.clone()))
      .collect();

    prop_assert_eq!(serialize(&vars), serialize(&reversed));
  }

  #[test]
  fn parse_never_panics(input in "\\PC*(\n\\PC*){0,8}") {
    let parsed = parse(&input, ParseOptions::default());
    prop_assert!(parsed.warnings.len() <= input.split('\n').count());
  }
}

#[test]
fn test_documented_file_format_reads_back() {
  let input = "# this file was created automatically by heroku-config

KEY1=\"value one\"
KEY2=\"line one\\nline two\"
KEY3=\"a
multi
line
value\"
";

  let parsed = parse(input, ParseOptions::default());

  assert!(parsed.warnings.is_empty());
  assert_eq!(parsed.vars.len(), 3);
  assert_eq!(parsed.vars["KEY1"], "value one");
  assert_eq!(parsed.vars["KEY2"], "line one\\nline two");
  assert_eq!(parsed.vars["KEY3"], "a\nmulti\nline\nvalue");
}

#[test]
fn test_multiline_written_back_escaped() {
  let parsed = parse("KEY3=\"a\nmulti\"\n", ParseOptions::default());

  assert_eq!(
    serialize(&parsed.vars),
    "# this file was created automatically by heroku-config\n\nKEY3=\"a\\nmulti\"\n"
  );
}

#[test]
fn test_warnings_in_document_order() {
  let parsed = parse(
    "A=1\n???\nA=2\nB=\"unterminated",
    ParseOptions::default(),
  );

  assert_eq!(
    parsed.warnings,
    vec![
      ParseWarning::UnparsableLine {
        line: 2,
        content: "???".into()
      },
      ParseWarning::DuplicateKey {
        line: 3,
        key: "A".into()
      },
      ParseWarning::UnterminatedValue {
        line: 4,
        key: "B".into()
      },
    ]
  );
  assert_eq!(
    parsed.warnings[1].to_string(),
    "A is in env file twice (line 3)"
  );
}

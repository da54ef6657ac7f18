use heck::{ToKebabCase, ToLowerCamelCase, ToPascalCase, ToShoutySnakeCase, ToSnakeCase};
use minijinja::value::Value;

use crate::slug::slugify;

// Export individual filter functions
pub use self::camelcase as filter_camelcase;
pub use self::kebabcase as filter_kebabcase;
pub use self::pascalcase as filter_pascalcase;
pub use self::screamingsnakecase as filter_screamingsnakecase;
pub use self::slug as filter_slug;
pub use self::snakecase as filter_snakecase;

/// `{{ title | slug }}`. Falsy input renders as `false`, same as a record
/// without a title.
pub fn slug(value: Value) -> Value {
    if !value.is_true() {
        return Value::from(false);
    }
    match slugify(&value.to_string()) {
        Some(s) => Value::from(s),
        None => Value::from(false),
    }
}

pub fn camelcase(s: String) -> String {
    s.to_lower_camel_case()
}

pub fn pascalcase(s: String) -> String {
    s.to_pascal_case()
}

pub fn snakecase(s: String) -> String {
    s.to_snake_case()
}

pub fn kebabcase(s: String) -> String {
    s.to_kebab_case()
}

pub fn screamingsnakecase(s: String) -> String {
    s.to_shouty_snake_case()
}

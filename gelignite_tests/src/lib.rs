#![cfg(test)]

macro_rules! av {
    (null) => {
        ::gelignite::AttributeValue::Null
    };
    (s: $v:expr) => {
        ::gelignite::AttributeValue::S($v.into())
    };
    (n: $v:expr) => {
        ::gelignite::AttributeValue::N($v.to_string())
    };
    (bool: $v:expr) => {
        ::gelignite::AttributeValue::Bool($v)
    };
    (l: $v:expr) => {
        ::gelignite::AttributeValue::L($v)
    };
    (m: $v:expr) => {
        ::gelignite::AttributeValue::M($v)
    };
}

macro_rules! m {
    ($( $k:expr => $v:expr, )*) => {
        <_>::into_iter([
            $(
                ($k.to_string(), $v),
            )*
        ]).collect::<::gelignite::Item>()
    };
}

mod mock;

mod beans;
mod documents;
mod immutables;
mod polymorphic;
mod providers;
mod wire;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

use env_logger::Env;

#[macro_export]
macro_rules! current_function {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        &name[..name.len() - 3]
    }};
}

pub fn init_logging() {
    env_logger::Builder::from_env(Env::default())
        .format_timestamp_millis()
        .init();
}

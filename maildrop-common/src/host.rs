/// The system host name, or `localhost` if it can't be determined.
pub fn hostname() -> String {
    ::hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| String::from("localhost"))
}

/// Derives the admission key for a request.
///
/// Implemented for any `Fn(&Req) -> String`, so a closure that reads a user id,
/// an API token or a peer address is enough.
pub trait KeyExtractor<Req> {
    fn extract(&self, req: &Req) -> String;
}

impl<Req, F> KeyExtractor<Req> for F
where
    F: Fn(&Req) -> String,
{
    fn extract(&self, req: &Req) -> String {
        self(req)
    }
}

/// Puts every request under one shared key.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalKey;

impl GlobalKey {
    pub const KEY: &'static str = "global";
}

impl<Req> KeyExtractor<Req> for GlobalKey {
    fn extract(&self, _req: &Req) -> String {
        Self::KEY.to_owned()
    }
}

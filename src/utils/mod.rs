pub mod constants;
pub mod url_utils;

pub use constants::*;
pub use url_utils::{
    CanonicalUrl, MirrorPath, Origin, Resolution, UrlError, is_same_origin,
    mirror_reference, proxy_route, resolve, resolve_against_origin, to_mirror_path,
    url_is_same_origin,
};

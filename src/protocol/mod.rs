pub mod codec;
pub mod messages;

pub use codec::{Connection, DelimiterCodec, FrameCodec};
pub use messages::{decode_cube_list, decode_planets, is_auth_success, Request};

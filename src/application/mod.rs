/// Application層
///
/// リソース取得、安定化、ゲームセッション、ポーリングドライバを提供。
/// Domain層のPortトレイトにのみ依存し、具体的なコラボレータは
/// Infrastructure層からDIで注入される。
pub mod acquisition;
pub mod game_loop;
pub mod runtime_state;
pub mod session;
pub mod stabilizer;
pub mod stats;

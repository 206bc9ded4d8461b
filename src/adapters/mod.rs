// Adapters layer: concrete implementations of the domain ports (Twitter API, output, clock).

pub mod clock;
pub mod sink;
pub mod tweet_stream;
pub mod twitter_client;

pub use clock::SystemClock;
pub use sink::{LineSink, OutputSink};
pub use tweet_stream::TweetStream;
pub use twitter_client::TwitterClient;

//! Source → transform → sink plumbing for batch reading imports.

use std::{pin::Pin, sync::Arc, time::SystemTime};

use futures::{Stream, StreamExt};

/// A record in flight, tagged with where it came from (`file:line`).
#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub payload: T,
    pub received_at: SystemTime,
    pub origin: String,
}

impl<T> Envelope<T> {
    pub fn new(payload: T, origin: impl Into<String>) -> Self {
        Self {
            payload,
            received_at: SystemTime::now(),
            origin: origin.into(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("source error: {0}")]
    Source(String),
    #[error("transform error: {0}")]
    Transform(String),
    #[error("sink error: {0}")]
    Sink(String),
}

pub type EnvelopeStream<T> = Pin<Box<dyn Stream<Item = Result<Envelope<T>, PipelineError>> + Send>>;

#[async_trait::async_trait]
pub trait Source<T>: Send + Sync {
    async fn stream(&self) -> EnvelopeStream<T>;
}

#[async_trait::async_trait]
pub trait Transform<I, O>: Send + Sync {
    async fn apply(&self, input: Envelope<I>) -> Result<Envelope<O>, PipelineError>;
}

/// Terminal stage. Per-record errors arriving from upstream are the sink's to
/// count or skip; returning `Err` aborts the whole run.
#[async_trait::async_trait]
pub trait Sink<T>: Send + Sync {
    type Output: Send;

    async fn run<S>(&self, input: S) -> Result<Self::Output, PipelineError>
    where
        S: Stream<Item = Result<Envelope<T>, PipelineError>> + Send + Unpin + 'static;
}

pub struct Pipeline<S, T, K> {
    pub source: S,
    pub transforms: Vec<Arc<dyn Transform<T, T> + Send + Sync>>, // same-type transforms chain
    pub sink: K,
}

impl<T, S, K> Pipeline<S, T, K>
where
    T: Send + 'static,
    S: Source<T> + Send + Sync + 'static,
    K: Sink<T> + Send + Sync + 'static,
{
    pub async fn run(self) -> Result<K::Output, PipelineError> {
        let mut stream = self.source.stream().await;

        // Apply transforms in sequence; records keep their source order.
        for t in self.transforms {
            let t_arc = t.clone();
            stream = Box::pin(stream.then(move |item| {
                let t_inner = t_arc.clone();
                async move {
                    match item {
                        Ok(env) => t_inner.apply(env).await,
                        Err(e) => Err(e),
                    }
                }
            }));
        }

        self.sink.run(stream).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct VecSource(Vec<u32>);

    #[async_trait::async_trait]
    impl Source<u32> for VecSource {
        async fn stream(&self) -> EnvelopeStream<u32> {
            let items: Vec<_> = self
                .0
                .iter()
                .enumerate()
                .map(|(i, v)| Ok(Envelope::new(*v, format!("vec:{}", i + 1))))
                .collect();
            Box::pin(futures::stream::iter(items))
        }
    }

    struct RejectOdd;

    #[async_trait::async_trait]
    impl Transform<u32, u32> for RejectOdd {
        async fn apply(&self, input: Envelope<u32>) -> Result<Envelope<u32>, PipelineError> {
            if input.payload % 2 == 1 {
                Err(PipelineError::Transform(format!("{}: odd", input.origin)))
            } else {
                Ok(input)
            }
        }
    }

    struct Collect;

    #[async_trait::async_trait]
    impl Sink<u32> for Collect {
        type Output = (Vec<u32>, Vec<String>);

        async fn run<S>(&self, mut input: S) -> Result<Self::Output, PipelineError>
        where
            S: Stream<Item = Result<Envelope<u32>, PipelineError>> + Send + Unpin + 'static,
        {
            let mut ok = Vec::new();
            let mut errors = Vec::new();
            while let Some(item) = input.next().await {
                match item {
                    Ok(env) => ok.push(env.payload),
                    Err(e) => errors.push(e.to_string()),
                }
            }
            Ok((ok, errors))
        }
    }

    #[tokio::test]
    async fn transforms_filter_in_source_order() {
        let pipeline: Pipeline<_, u32, _> = Pipeline {
            source: VecSource(vec![2, 3, 4, 5]),
            transforms: vec![Arc::new(RejectOdd)],
            sink: Collect,
        };

        let (ok, errors) = pipeline.run().await.unwrap();
        assert_eq!(ok, vec![2, 4]);
        assert_eq!(errors, vec!["transform error: vec:2: odd", "transform error: vec:4: odd"]);
    }
}

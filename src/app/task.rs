// SPDX-License-Identifier: GPL-3.0-only

//! Deferred work produced by `update`
//!
//! A `Task` is a set of single-resolution futures, each yielding exactly one
//! message that the runtime feeds back into `update` on the UI thread.

use futures::FutureExt;
use futures::future::BoxFuture;
use std::future::Future;

#[must_use = "a Task does nothing unless handed to the runtime"]
pub struct Task<M> {
    futures: Vec<BoxFuture<'static, M>>,
}

impl<M: Send + 'static> Task<M> {
    /// No work
    pub fn none() -> Self {
        Self {
            futures: Vec::new(),
        }
    }

    /// Run `future` and turn its output into a message
    pub fn perform<T, F>(future: F, f: impl FnOnce(T) -> M + Send + 'static) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            futures: vec![future.map(f).boxed()],
        }
    }

    /// Deliver `message` on the next turn of the loop
    pub fn done(message: M) -> Self {
        Self {
            futures: vec![futures::future::ready(message).boxed()],
        }
    }

    pub fn batch(tasks: impl IntoIterator<Item = Task<M>>) -> Self {
        Self {
            futures: tasks.into_iter().flat_map(|task| task.futures).collect(),
        }
    }

    /// Wrap every produced message
    pub fn map<N: Send + 'static>(self, f: impl Fn(M) -> N + Clone + Send + 'static) -> Task<N> {
        Task {
            futures: self
                .futures
                .into_iter()
                .map(|future| {
                    let f = f.clone();
                    future.map(f).boxed()
                })
                .collect(),
        }
    }

    pub fn is_none(&self) -> bool {
        self.futures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.futures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.futures.is_empty()
    }

    pub fn into_futures(self) -> Vec<BoxFuture<'static, M>> {
        self.futures
    }
}

impl<M> std::fmt::Debug for Task<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("pending", &self.futures.len())
            .finish()
    }
}

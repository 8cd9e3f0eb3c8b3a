// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Dynamic binary translation core: basic-block discovery and caching,
//! the page-indexed reverse map for self-modifying-code invalidation, and
//! the dispatcher that drives cached and uncached execution.

pub mod block;
pub mod cache;
pub mod classify;
pub mod decoder;
pub mod dispatcher;
pub mod emitter;
mod property_tests;

pub use block::{CodeBlock, CodeBlockInstruction, CodeBlockKey, ExecutableBlock, PAGE_SIZE};
pub use cache::BlockCache;
pub use dispatcher::Dispatcher;
pub use emitter::{Emitter, NullEmitter};

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::SqlitePool;

use crate::schema::init_schema;

pub async fn create_test_pool() -> SqlitePool {
	let pool = SqlitePool::connect(":memory:").await.unwrap();
	init_schema(&pool).await.unwrap();
	pool
}

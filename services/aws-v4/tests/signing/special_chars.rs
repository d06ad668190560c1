// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use super::{compare_with_aws_sigv4, request};
use anyhow::Result;
use http::Request;

fn special_characters() -> Request<&'static str> {
    request(
        http::Method::HEAD,
        "http://127.0.0.1:9000/%21%40%23%24%25%5E%26%2A%28%29_%2B-%3D%3B%3A%27%3E%3C%2C%2F%3F.txt",
        "",
    )
}

fn spaces() -> Request<&'static str> {
    request(
        http::Method::HEAD,
        "http://127.0.0.1:9000/test%20file%20with%20spaces.txt",
        "",
    )
}

fn unicode() -> Request<&'static str> {
    request(
        http::Method::HEAD,
        "http://127.0.0.1:9000/%E6%96%87%E4%BB%B6%E5%90%8D.txt",
        "",
    )
}

fn dot_segments() -> Request<&'static str> {
    request(http::Method::GET, "http://127.0.0.1:9000/a/./b/../c", "")
}

fn query_with_reserved_characters() -> Request<&'static str> {
    request(
        http::Method::GET,
        "http://127.0.0.1:9000/hello?prefix=a%2Fb%20c&marker=%E6%96%87",
        "",
    )
}

#[tokio::test]
async fn test_special_characters() -> Result<()> {
    for (name, req) in [
        ("special_characters", special_characters as fn() -> Request<&'static str>),
        ("spaces", spaces),
        ("unicode", unicode),
        ("dot_segments", dot_segments),
        ("query_with_reserved_characters", query_with_reserved_characters),
    ] {
        compare_with_aws_sigv4(name, req, None, None).await?;
    }
    Ok(())
}

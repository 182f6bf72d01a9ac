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

use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;
use std::time::Duration;

// Env values used by workload identity federation.
pub const GOOGLE_WORKLOADIDENTITY_AUDIENCE: &str = "GOOGLE_WORKLOADIDENTITY_AUDIENCE";
pub const GOOGLE_WORKLOADIDENTITY_SERVICEACCOUNT: &str = "GOOGLE_WORKLOADIDENTITY_SERVICEACCOUNT";
pub const GOOGLE_WORKLOADIDENTITY_SOURCE: &str = "GOOGLE_WORKLOADIDENTITY_SOURCE";
pub const GOOGLE_WORKLOADIDENTITY_METADATA_URL: &str = "GOOGLE_WORKLOADIDENTITY_METADATA_URL";
pub const GOOGLE_WORKLOADIDENTITY_METADATA_HEADERS: &str =
    "GOOGLE_WORKLOADIDENTITY_METADATA_HEADERS";
pub const GOOGLE_WORKLOADIDENTITY_METADATA_RESOURCE_PARAM: &str =
    "GOOGLE_WORKLOADIDENTITY_METADATA_RESOURCE_PARAM";
pub const GOOGLE_WORKLOADIDENTITY_METADATA_FIELD: &str = "GOOGLE_WORKLOADIDENTITY_METADATA_FIELD";
pub const GOOGLE_WORKLOADIDENTITY_TOKEN_FILE: &str = "GOOGLE_WORKLOADIDENTITY_TOKEN_FILE";
pub const GOOGLE_WORKLOADIDENTITY_SCOPES: &str = "GOOGLE_WORKLOADIDENTITY_SCOPES";

// Default OAuth2 scope for Google Cloud services
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

pub const DEFAULT_TOKEN_URL: &str = "https://sts.googleapis.com/v1/token";
pub const DEFAULT_REGIONAL_CRED_VERIFICATION_URL: &str =
    "https://sts.{region}.amazonaws.com?Action=GetCallerIdentity&Version=2011-06-15";
pub const IMPERSONATION_URL_PREFIX: &str =
    "https://iamcredentials.googleapis.com/v1/projects/-/serviceAccounts/";
pub const IMPERSONATION_URL_SUFFIX: &str = ":generateAccessToken";

// Token exchange (RFC 8693) values.
pub const GRANT_TYPE_TOKEN_EXCHANGE: &str = "urn:ietf:params:oauth:grant-type:token-exchange";
pub const TOKEN_TYPE_ACCESS_TOKEN: &str = "urn:ietf:params:oauth:token-type:access_token";

pub const X_GOOG_CLOUD_TARGET_RESOURCE: &str = "x-goog-cloud-target-resource";

pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(43200);

/// Lower bound of the expiry safety margin.
pub const MIN_EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// AsciiSet used to percent-encode the signed request envelope.
///
/// - URI encode every byte except the unreserved characters: 'A'-'Z', 'a'-'z', '0'-'9', '-', '.', '_', and '~'.
pub static SUBJECT_TOKEN_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

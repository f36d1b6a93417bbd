//! 宣言ドキュメントのモデル
//!
//! トップレベルの `instances` / `buckets` / `resources` グループと、
//! リソース種別・識別子の解決ルールを定義する

use crate::error::{DocumentError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// リソース仕様（プロバイダー固有の属性マップ）
pub type ResourceSpec = serde_json::Map<String, serde_json::Value>;

const INSTANCE_ID_FIELDS: &[&str] = &["instance_name", "instance_id"];
const BUCKET_ID_FIELDS: &[&str] = &["bucket_name"];
const RESOURCE_ID_FIELDS: &[&str] = &["name", "resource_id"];

/// 宣言ドキュメント
///
/// 未知のトップレベルキーは無視される。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesiredStateDocument {
    /// コンピュートインスタンス
    #[serde(default, deserialize_with = "null_as_empty")]
    pub instances: Vec<ResourceSpec>,

    /// ストレージバケット
    #[serde(default, deserialize_with = "null_as_empty")]
    pub buckets: Vec<ResourceSpec>,

    /// `type` で判別される異種リソース（iam_user, iam_role, iam_policy, vpc, subnet）
    #[serde(default, deserialize_with = "null_as_empty")]
    pub resources: Vec<ResourceSpec>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl DesiredStateDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// 宣言されたエントリの総数
    pub fn len(&self) -> usize {
        self.instances.len() + self.buckets.len() + self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 全エントリを固定順序（instances → buckets → resources）で展開する
    ///
    /// 1件でも識別子が欠けていればエラーを返し、部分的な結果は返さない。
    pub fn declared_resources(&self) -> Result<Vec<DeclaredResource>> {
        let mut declared = Vec::with_capacity(self.len());

        for (index, spec) in self.instances.iter().enumerate() {
            let id = identifier(spec, ResourceGroup::Instances, index, INSTANCE_ID_FIELDS)?;
            declared.push(DeclaredResource {
                group: ResourceGroup::Instances,
                index,
                kind: DeclaredKind::Supported(ResourceKind::Instance),
                id,
                spec: spec.clone(),
            });
        }

        for (index, spec) in self.buckets.iter().enumerate() {
            let id = identifier(spec, ResourceGroup::Buckets, index, BUCKET_ID_FIELDS)?;
            declared.push(DeclaredResource {
                group: ResourceGroup::Buckets,
                index,
                kind: DeclaredKind::Supported(ResourceKind::Bucket),
                id,
                spec: spec.clone(),
            });
        }

        for (index, spec) in self.resources.iter().enumerate() {
            let tag = spec.get("type").and_then(|v| v.as_str()).unwrap_or_default();

            let resource = match ResourceKind::from_type_tag(tag) {
                Some(kind) => DeclaredResource {
                    group: ResourceGroup::Resources,
                    index,
                    kind: DeclaredKind::Supported(kind),
                    id: identifier(spec, ResourceGroup::Resources, index, RESOURCE_ID_FIELDS)?,
                    spec: spec.clone(),
                },
                // 未対応タイプは識別子を要求しない（結果表示用のラベルのみ）
                None => DeclaredResource {
                    group: ResourceGroup::Resources,
                    index,
                    kind: DeclaredKind::Unsupported(tag.to_string()),
                    id: identifier(spec, ResourceGroup::Resources, index, RESOURCE_ID_FIELDS)
                        .unwrap_or_else(|_| format!("resources[{}]", index)),
                    spec: spec.clone(),
                },
            };
            declared.push(resource);
        }

        Ok(declared)
    }
}

/// 識別子フィールドを優先順に探す
///
/// 空文字列は未指定として扱い、次の候補へ進む。
fn identifier(
    spec: &ResourceSpec,
    group: ResourceGroup,
    index: usize,
    fields: &[&str],
) -> Result<String> {
    for field in fields {
        match spec.get(*field) {
            None | Some(serde_json::Value::Null) => continue,
            Some(serde_json::Value::String(s)) if s.trim().is_empty() => continue,
            Some(serde_json::Value::String(s)) => return Ok(s.clone()),
            Some(serde_json::Value::Number(n)) => return Ok(n.to_string()),
            Some(_) => {
                return Err(DocumentError::InvalidIdentifier {
                    group: group.to_string(),
                    index,
                    field: field.to_string(),
                });
            }
        }
    }

    Err(DocumentError::MissingIdentifier {
        group: group.to_string(),
        index,
        fields: fields.join(" / "),
    })
}

/// ドキュメントのトップレベルグループ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceGroup {
    Instances,
    Buckets,
    Resources,
}

impl ResourceGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceGroup::Instances => "instances",
            ResourceGroup::Buckets => "buckets",
            ResourceGroup::Resources => "resources",
        }
    }
}

impl fmt::Display for ResourceGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// プロビジョニング可能なリソース種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Instance,
    Bucket,
    IamUser,
    IamRole,
    IamPolicy,
    Vpc,
    Subnet,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::Instance,
        ResourceKind::Bucket,
        ResourceKind::IamUser,
        ResourceKind::IamRole,
        ResourceKind::IamPolicy,
        ResourceKind::Vpc,
        ResourceKind::Subnet,
    ];

    /// 台帳（state file）上のタイプキー
    pub fn ledger_type(&self) -> &'static str {
        match self {
            ResourceKind::Instance => "instances",
            ResourceKind::Bucket => "buckets",
            ResourceKind::IamUser => "iam_users",
            ResourceKind::IamRole => "iam_roles",
            ResourceKind::IamPolicy => "iam_policies",
            ResourceKind::Vpc => "vpcs",
            ResourceKind::Subnet => "subnets",
        }
    }

    /// ドキュメント上の `type` タグ
    pub fn type_tag(&self) -> &'static str {
        match self {
            ResourceKind::Instance => "instance",
            ResourceKind::Bucket => "bucket",
            ResourceKind::IamUser => "iam_user",
            ResourceKind::IamRole => "iam_role",
            ResourceKind::IamPolicy => "iam_policy",
            ResourceKind::Vpc => "vpc",
            ResourceKind::Subnet => "subnet",
        }
    }

    /// `resources` グループの `type` タグから種別を解決
    ///
    /// instance / bucket は専用グループで宣言するため、ここでは解決しない。
    pub fn from_type_tag(tag: &str) -> Option<Self> {
        match tag {
            "iam_user" => Some(ResourceKind::IamUser),
            "iam_role" => Some(ResourceKind::IamRole),
            "iam_policy" => Some(ResourceKind::IamPolicy),
            "vpc" => Some(ResourceKind::Vpc),
            "subnet" => Some(ResourceKind::Subnet),
            _ => None,
        }
    }

    pub fn from_ledger_type(ledger_type: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.ledger_type() == ledger_type)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ResourceKind::Instance => "instance",
            ResourceKind::Bucket => "bucket",
            ResourceKind::IamUser => "IAM user",
            ResourceKind::IamRole => "IAM role",
            ResourceKind::IamPolicy => "IAM policy",
            ResourceKind::Vpc => "VPC",
            ResourceKind::Subnet => "subnet",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// 宣言エントリの種別判定結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaredKind {
    Supported(ResourceKind),
    /// 未対応の `type`（未指定の場合は空文字列）
    Unsupported(String),
}

/// 展開済みの宣言エントリ
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredResource {
    pub group: ResourceGroup,
    /// グループ内の位置
    pub index: usize,
    pub kind: DeclaredKind,
    pub id: String,
    pub spec: ResourceSpec,
}

impl DeclaredResource {
    /// 台帳上のタイプキー（未対応タイプはタグそのもの）
    pub fn ledger_type(&self) -> &str {
        match &self.kind {
            DeclaredKind::Supported(kind) => kind.ledger_type(),
            DeclaredKind::Unsupported(tag) => tag,
        }
    }

    pub fn supported_kind(&self) -> Option<ResourceKind> {
        match self.kind {
            DeclaredKind::Supported(kind) => Some(kind),
            DeclaredKind::Unsupported(_) => None,
        }
    }

    /// 文字列属性を取得
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.spec.get(key).and_then(|v| v.as_str())
    }
}

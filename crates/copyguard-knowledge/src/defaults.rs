//! Built-in fallback rule set, used when no rule document is available.

/// Source id attached to chunks built from [`DEFAULT_RULES`].
pub const DEFAULT_RULES_SOURCE: &str = "builtin:default-rules";

pub const DEFAULT_RULES: &str = "\
合规指引（内置默认规则）

一、核心法规依据与通用禁用原则
1. 绝对化词汇禁用：立竿见影、百分之百、根治、完全、绝对、彻底、永不、第一、顶级、最等。
   风险类别：绝对化；风险等级：绝对禁止；规则出处：指引 1、核心法规依据与通用禁用原则。
2. 医疗术语禁用：修复毛囊、治疗、治愈、药物、处方、消炎、抗菌、排毒等。
   风险类别：医疗术语；风险等级：绝对禁止；规则出处：指引 1、核心法规依据与通用禁用原则。
3. 超范围宣传：不得超出产品实际功效范围，不得暗示普通化妆品具有药品功效。
   风险类别：超范围；风险等级：警告；规则出处：指引 1、核心法规依据与通用禁用原则。

二、产品专属禁用词汇
1. 多肽蓬蓬瓶（修护类产品）：
   禁用词汇：修复毛囊、生发、治疗脱发、根治脱发。
   风险类别：产品专属禁用；风险等级：绝对禁止；规则出处：指引 1、多肽蓬蓬瓶-修护。

Compliance guideline (built-in default rules)

1. Absolute claims are prohibited: \"completely cures\", \"100%\", \"instant\", \"guaranteed\", \"absolute\", \"best\", \"number one\".
   Category: absolute-claim; level: absolute-prohibition; source: guideline 1, core regulations and general prohibitions.
2. Medical terms are prohibited for cosmetics: \"follicle repair\", \"treatment\", \"cure\", \"anti-inflammatory\", \"prescription\".
   Category: medical-term; level: absolute-prohibition; source: guideline 1, core regulations and general prohibitions.
3. Claims beyond the product's actual effect are prohibited.
   Category: scope-overreach; level: warning; source: guideline 1, core regulations and general prohibitions.
";

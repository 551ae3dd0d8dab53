// Default refine-chain prompt templates.
// Placeholders: `{text}` in the initial template, `{existing_answer}` and
// `{text}` in the refine template. Literal braces are written `{{` / `}}`.

pub const INITIAL_TEMPLATE: &str = "\
You are a professional CV analyzer with expertise in resume evaluation and career coaching.
Write a detailed analysis of the following resume content:
{text}";

pub const REFINE_TEMPLATE: &str = "\
Your job is to produce a final outcome.
We have provided an existing detail: {existing_answer}
We want a refined version of the existing detail based on the additional resume content below.
--------
{text}
--------
Given the new context, refine the original summary in the following manner using proper markdown formatting:
## Overview
## Strengths
## Areas for Improvement
## Recommendations
If the new context adds nothing, return the existing detail unchanged.";

/*!

This is the long-form manual for `electoral_goals` and `egtrack`.

## Input formats

The following formats are supported:
* `csv` Comma Separated Values, one row per polling booth or per section
* `xlsx` Excel workbooks (only the first worksheet, unless a worksheet name is given)

Both formats expect a header row. The columns are recognized by name:

| column             | meaning                               |
|--------------------|---------------------------------------|
| `SECCION`          | section identifier (mandatory)        |
| `MUNICIPIO`        | municipality code or name             |
| `DISTRITO_L`       | local district                        |
| `DISTRITO_F`       | federal district                      |
| `LISTA_NOMINAL`    | registered voters                     |
| `TOTAL_VOTOS`      | total reported by the source          |

The names can be changed in the `recordSources` block of the configuration. Every other
column is an option column (a party, a coalition ballot such as `PAN-PRI-PRD`, `NULOS`,
`NO_REGISTRADAS`), except the ones listed in `ignoredColumns`. When `optionColumns` is
provided, only these columns are read as options.

Cells are read as follows:
- the section is always read as text: `0102` and `102` are different sections
- a blank cell or `-` is zero
- thousands separators are removed: `1,234` is 1234
- a cell that is not a number counts zero in an option column, and a warning is logged
- a row without section, or with a negative count, is rejected and reported

Several rows with the same section (one per booth) are merged into one record by adding
all their counts.

Municipalities given as numbers are translated with the `municipalityNames` table of the
configuration. When a `sectionLookup` file is given, the municipality and districts missing
from a row are taken from that file.

## Coalitions

A coalition is a name, a color and a list of party codes. Its votes in a section are the sum
of the votes of its members; a member that does not appear in the data counts zero.

Some sources also report the votes cast for the coalition itself (columns such as
`PAN-PRI-PRD`). These columns are not added automatically. To include them, list them as
members:

```json
{ "name": "Va por México", "color": "#6B46C1",
  "parties": ["PAN", "PRI", "PRD", "PAN-PRI-PRD", "PAN-PRI", "PAN-PRD", "PRI-PRD"] }
```

## Goals

A goal is a target percentage between 1 and 100 and a basis:
* `total`: the goal is a share of all the votes cast (including null votes)
* `coalition`: the goal is a share of the current votes of the coalition

The required number of votes is rounded up. In each section, the same rule is applied to the
section alone, and the sections are listed from the weakest share of the coalition to the
strongest. Each section then gets a status:
* `reached` the coalition has at least the required votes
* `close` the coalition has at least 90% of the required votes
* `far` otherwise
* `no votes` nobody voted in the section

and a priority: `high` for the close sections, `medium` for the sections that are not reached
but have at least 70% of the required votes, `low` for everything else.

The summary counts the reached and close sections. Sections without votes are listed but
left out of the success rate. With a goal, the summary also shows how the coalition fares
section by section: sections won and lost, average margins, and wins per municipality.

## Targets

Targets follow one unit (party or coalition) with a fixed objective: a number of votes, a
share of the votes, or a number of sections won. The progress is capped at 100%. A target is
`achieved` at 100%, `on-track` from 75% and `behind` below.

## Competitiveness

The margin between the first and the second unit, in percentage points:

| margin     | label                    |
|------------|--------------------------|
| below 5    | very competitive         |
| below 10   | competitive              |
| below 20   | moderately competitive   |
| 20 or more | not competitive          |

Without a second unit with votes, the margin is 0.

*/

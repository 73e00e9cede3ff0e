//! GraphQL documents for the tracker operations this relay needs: one
//! issue-with-comments read and the two comment writes.

pub const ISSUE_WITH_COMMENTS_QUERY: &str = r"
  query IssueWithComments($issueId: String!) {
    issue(id: $issueId) {
      id
      identifier
      title
      description
      url
      state {
        name
        type
      }
      priority
      priorityLabel
      team {
        key
        name
      }
      assignee {
        name
        email
      }
      labels {
        nodes {
          name
        }
      }
      comments {
        nodes {
          id
          body
          createdAt
          user {
            name
            email
          }
        }
      }
    }
  }
";

pub const CREATE_COMMENT_MUTATION: &str = r"
  mutation CreateComment($issueId: String!, $body: String!) {
    commentCreate(input: { issueId: $issueId, body: $body }) {
      success
      comment {
        id
        body
        createdAt
      }
    }
  }
";

pub const UPDATE_COMMENT_MUTATION: &str = r"
  mutation UpdateComment($commentId: String!, $body: String!) {
    commentUpdate(id: $commentId, input: { body: $body }) {
      success
      comment {
        id
        body
      }
    }
  }
";
